//! Extraction orchestration: resolve, classify, extract, assemble.
//!
//! A `Pipeline` holds only immutable collaborators; every call to
//! [`Pipeline::handle`] is independent and may run concurrently with others.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;
use utoipa::ToSchema;

use crate::config::Config;
use crate::extractor::{
    ChromeRenderer, ExtractedFields, RenderError, RenderedExtractor, Renderer, extract_static,
};
use crate::fetcher::{FetchError, HttpFetcher, PageFetcher};
use crate::resolver::{ResolvedRequest, Resolver};
use crate::site::{SiteStrategy, classify_url};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PipelineError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Fetch(_) => "FetchError",
            Self::Render(_) => "RenderError",
        }
    }
}

/// Normalized product metadata for one input URL.
///
/// `input_url` and `redirect_chain[0]` are the caller's input as given
/// (trimmed); later hops are the URLs the fetcher actually reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ExtractionOutcome {
    pub input_url: String,
    pub redirect_chain: Vec<String>,
    pub final_url: String,
    pub site: SiteStrategy,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
}

impl ExtractionOutcome {
    fn assemble(
        input: &str,
        resolved: &ResolvedRequest,
        site: SiteStrategy,
        fields: ExtractedFields,
    ) -> Self {
        let hops = resolved.redirect_chain().iter().skip(1).map(Url::to_string);
        Self {
            input_url: input.to_string(),
            redirect_chain: std::iter::once(input.to_string()).chain(hops).collect(),
            final_url: resolved.final_url().to_string(),
            site,
            title: fields.title.map(|f| f.value),
            description: fields.description.map(|f| f.value),
            image: fields.image.map(|f| f.value),
            price: fields.price.map(|f| f.value),
        }
    }
}

pub struct Pipeline {
    resolver: Resolver,
    /// `None` when rendering is disabled; rendered strategies then run statically.
    rendered: Option<RenderedExtractor>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn Renderer>>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            resolver: Resolver::new(fetcher),
            rendered: renderer.map(|renderer| RenderedExtractor::new(renderer, render_timeout)),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.fetch())?);
        let render = config.render();
        let renderer = render
            .enabled
            .then(|| Arc::new(ChromeRenderer::new(render)) as Arc<dyn Renderer>);
        Ok(Self::new(fetcher, renderer, render.timeout))
    }

    /// Extracts product metadata for `input`.
    #[instrument(skip(self))]
    pub async fn handle(&self, input: &str) -> Result<ExtractionOutcome, PipelineError> {
        let input = input.trim();
        let url = validate(input)?;

        let resolved = self.resolver.resolve(&url).await?;
        let site = self.strategy_for(resolved.final_url());
        info!(final_url = %resolved.final_url(), %site, hops = resolved.redirect_chain().len(), "classified page");

        let fields = match (site, &self.rendered) {
            (SiteStrategy::Invalid, _) => {
                return Err(PipelineError::Validation(format!(
                    "resolved to an unsupported url: {}",
                    resolved.final_url()
                )));
            }
            (site, Some(rendered)) if site.requires_rendering() => {
                rendered.extract(resolved.final_url(), site).await?
            }
            (site, _) => extract_static(resolved.html(), site),
        };
        debug!(?fields, "extracted fields");

        Ok(ExtractionOutcome::assemble(input, &resolved, site, fields))
    }

    fn strategy_for(&self, url: &Url) -> SiteStrategy {
        let site = classify_url(url);
        if self.rendered.is_some() {
            site
        } else {
            site.without_rendering()
        }
    }
}

/// Rejects input that is not an absolute http(s) URL before any network call.
fn validate(input: &str) -> Result<Url, PipelineError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PipelineError::Validation("missing url".to_string()));
    }
    let url = Url::parse(input)
        .map_err(|e| PipelineError::Validation(format!("invalid url '{input}': {e}")))?;
    if classify_url(&url) == SiteStrategy::Invalid {
        return Err(PipelineError::Validation(format!(
            "unsupported url '{input}': expected an http(s) address"
        )));
    }
    Ok(url)
}
