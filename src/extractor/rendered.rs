//! Extraction from a headless-rendered DOM.
//!
//! The browser only collects raw candidates: a fixed script, parameterised by
//! the vendor's selector table, returns a [`RenderedSnapshot`]. Choosing and
//! normalizing field values happens here in Rust, so the fallback order can
//! be tested without a browser.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::extractor::{
    chain::{Candidate, first_non_empty, non_blank},
    model::ExtractedFields,
    normalize::{clean_price, collapse_whitespace, format_bullets},
    selectors::{self, VendorSelectors},
};
use crate::fetcher::USER_AGENT;
use crate::site::SiteStrategy;

/// Upper bound for the in-page evaluation once the document has parsed.
const EVALUATION_TIMEOUT: Duration = Duration::from_secs(10);

const SNAPSHOT_SCRIPT: &str = r#"(() => {
  const plan = __PLAN__;
  const read = (source) => {
    try {
      const el = document.querySelector(source.selector);
      if (!el) return null;
      const value = source.attr ? el.getAttribute(source.attr) : el.textContent;
      return value == null ? null : String(value);
    } catch (e) {
      return null;
    }
  };
  const readAll = (selector) => {
    try {
      return Array.from(document.querySelectorAll(selector)).map((el) => el.textContent || "");
    } catch (e) {
      return [];
    }
  };
  const meta = (selector) => {
    const el = document.querySelector(selector);
    return el ? el.getAttribute("content") : null;
  };
  return {
    title: plan.title.map(read),
    price: plan.price.map(read),
    bullets: plan.bullets.map(readAll),
    image: plan.image.map(read),
    og_title: meta('meta[property="og:title"]'),
    og_description: meta('meta[property="og:description"]'),
    meta_description: meta('meta[name="description"]'),
    og_image: meta('meta[property="og:image"]'),
    document_title: document.title || null,
  };
})()"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderErrorKind {
    Launch,
    Navigation,
    Timeout,
    Evaluation,
}

#[derive(Debug, Error)]
#[error("{kind:?} failure: {message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
}

impl RenderError {
    pub fn new(kind: RenderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn launch(message: impl std::fmt::Display) -> Self {
        Self::new(RenderErrorKind::Launch, message.to_string())
    }

    pub fn navigation(message: impl std::fmt::Display) -> Self {
        Self::new(RenderErrorKind::Navigation, message.to_string())
    }

    pub fn evaluation(message: impl std::fmt::Display) -> Self {
        Self::new(RenderErrorKind::Evaluation, message.to_string())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Timeout, message)
    }
}

/// Identifying headers applied to every request a session makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub user_agent: String,
    pub accept_language: Option<String>,
}

impl SessionOptions {
    pub fn for_strategy(strategy: SiteStrategy) -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            accept_language: strategy.accept_language().map(str::to_string),
        }
    }
}

/// Launches isolated browser sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// One browser process with a single page, exclusively owned by one call.
///
/// Implementations must also release the process when dropped without
/// `close`, which is what happens when the calling future is cancelled.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates and returns once the document has parsed (DOMContentLoaded).
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError>;

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, RenderError>;

    /// Tears down the page and the browser process.
    async fn close(self: Box<Self>);
}

/// Raw candidates read from the rendered DOM, in selector-table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderedSnapshot {
    pub title: Vec<Option<String>>,
    pub price: Vec<Option<String>>,
    pub bullets: Vec<Vec<String>>,
    pub image: Vec<Option<String>>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub meta_description: Option<String>,
    pub og_image: Option<String>,
    pub document_title: Option<String>,
}

/// Builds the in-page routine for a vendor's selector table.
pub fn snapshot_script(selectors: &VendorSelectors) -> Result<String, RenderError> {
    let plan = serde_json::to_string(selectors).map_err(RenderError::evaluation)?;
    Ok(SNAPSHOT_SCRIPT.replace("__PLAN__", &plan))
}

fn title_chain() -> [Candidate<RenderedSnapshot>; 3] {
    [
        Candidate::new("vendor_title", vendor_title),
        Candidate::new("og_title", og_title),
        Candidate::new("document_title", document_title),
    ]
}

fn description_chain() -> [Candidate<RenderedSnapshot>; 3] {
    [
        Candidate::new("vendor_bullets", vendor_bullets),
        Candidate::new("og_description", og_description),
        Candidate::new("meta_description", meta_description),
    ]
}

// Snapshots carry no raw markup, so there is no embedded `hiRes` step.
fn image_chain() -> [Candidate<RenderedSnapshot>; 2] {
    [
        Candidate::new("og_image", og_image),
        Candidate::new("vendor_image", vendor_image),
    ]
}

fn price_chain() -> [Candidate<RenderedSnapshot>; 1] {
    [Candidate::new("vendor_price", vendor_price)]
}

/// Picks field values from a snapshot using the same priorities and
/// normalization as static extraction.
pub fn fields_from_snapshot(snapshot: &RenderedSnapshot) -> ExtractedFields {
    ExtractedFields {
        title: first_non_empty(snapshot, &title_chain()),
        description: first_non_empty(snapshot, &description_chain()),
        image: first_non_empty(snapshot, &image_chain()),
        price: first_non_empty(snapshot, &price_chain()),
    }
}

fn vendor_title(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot
        .title
        .iter()
        .find_map(|title| non_blank(title.clone()))
        .map(|title| collapse_whitespace(&title))
}

fn og_title(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot.og_title.clone()
}

fn document_title(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot.document_title.as_deref().map(collapse_whitespace)
}

fn vendor_bullets(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot.bullets.iter().find_map(|items| format_bullets(items))
}

fn og_description(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot.og_description.clone()
}

fn meta_description(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot.meta_description.clone()
}

fn og_image(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot.og_image.clone()
}

fn vendor_image(snapshot: &RenderedSnapshot) -> Option<String> {
    // lazy-loaded galleries put a data: placeholder in `src`
    snapshot.image.iter().find_map(|src| {
        non_blank(src.clone()).filter(|src| !src.starts_with("data:"))
    })
}

fn vendor_price(snapshot: &RenderedSnapshot) -> Option<String> {
    snapshot
        .price
        .iter()
        .find_map(|price| price.as_deref().and_then(clean_price))
}

/// Runs one rendering session per call and always tears it down.
#[derive(Clone)]
pub struct RenderedExtractor {
    renderer: Arc<dyn Renderer>,
    timeout: Duration,
}

impl RenderedExtractor {
    pub fn new(renderer: Arc<dyn Renderer>, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }

    #[instrument(skip_all, fields(url = %url, site = %strategy))]
    pub async fn extract(
        &self,
        url: &Url,
        strategy: SiteStrategy,
    ) -> Result<ExtractedFields, RenderError> {
        let script = snapshot_script(selectors::for_vendor(strategy.vendor()))?;
        let mut session = self
            .renderer
            .open(&SessionOptions::for_strategy(strategy))
            .await?;

        let result = self.run(session.as_mut(), url, &script).await;
        session.close().await;
        debug!("render session closed");

        if let Err(err) = &result {
            warn!(error = %err, "rendered extraction failed");
        }
        result
    }

    async fn run(
        &self,
        session: &mut dyn RenderSession,
        url: &Url,
        script: &str,
    ) -> Result<ExtractedFields, RenderError> {
        tokio::time::timeout(self.timeout, session.navigate(url))
            .await
            .map_err(|_| {
                RenderError::timeout(format!(
                    "navigation did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })??;

        let value = tokio::time::timeout(EVALUATION_TIMEOUT, session.evaluate(script))
            .await
            .map_err(|_| RenderError::timeout("page evaluation timed out"))??;

        let snapshot: RenderedSnapshot =
            serde_json::from_value(value).map_err(RenderError::evaluation)?;
        Ok(fields_from_snapshot(&snapshot))
    }
}
