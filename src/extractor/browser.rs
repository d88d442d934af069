//! Headless Chromium sessions driven over CDP with chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::RenderSettings;
use crate::extractor::rendered::{RenderError, RenderSession, Renderer, SessionOptions};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

// True once the navigated document (not the initial blank page) has parsed.
const READY_CHECK: &str =
    "document.location.href !== 'about:blank' && document.readyState !== 'loading'";

const BROWSER_ARGS: [&str; 6] = [
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
];

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    executable: Option<String>,
}

impl ChromeRenderer {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            executable: settings.chrome_executable.clone(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        // Containers usually lack the privileges the Chromium sandbox needs.
        let mut builder = BrowserConfig::builder().no_sandbox().args(BROWSER_ARGS);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RenderError::launch)
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    #[instrument(skip_all)]
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn RenderSession>, RenderError> {
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(RenderError::launch)?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        let mut session = ChromeSession {
            browser,
            handler_task,
            page: None,
        };

        match session.open_page(options).await {
            Ok(page) => {
                session.page = Some(page);
                debug!("browser session opened");
                Ok(Box::new(session))
            }
            Err(err) => {
                session.shutdown().await;
                Err(err)
            }
        }
    }
}

struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
}

impl ChromeSession {
    async fn open_page(&self, options: &SessionOptions) -> Result<Page, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(RenderError::launch)?;

        let mut user_agent = SetUserAgentOverrideParams::builder().user_agent(&options.user_agent);
        if let Some(language) = &options.accept_language {
            user_agent = user_agent.accept_language(language);
        }
        let user_agent = user_agent.build().map_err(RenderError::launch)?;
        page.execute(user_agent).await.map_err(RenderError::launch)?;

        Ok(page)
    }

    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::navigation("session has no open page"))
    }

    async fn shutdown(&mut self) {
        if let Some(page) = self.page.take()
            && let Err(err) = page.close().await
        {
            debug!(error = %err, "failed to close page");
        }
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "failed to close browser");
        }
        if let Err(err) = self.browser.wait().await {
            warn!(error = %err, "failed to reap browser process");
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    #[instrument(skip_all, fields(url = %url))]
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError> {
        let page = self.page()?;
        let response = page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(RenderError::navigation)?;
        if let Some(error) = &response.result.error_text {
            return Err(RenderError::navigation(error));
        }

        loop {
            let ready: bool = page
                .evaluate(READY_CHECK)
                .await
                .map_err(RenderError::navigation)?
                .into_value()
                .map_err(RenderError::navigation)?;
            if ready {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, RenderError> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(RenderError::evaluation)?
            .into_value()
            .map_err(RenderError::evaluation)
    }

    async fn close(mut self: Box<Self>) {
        self.shutdown().await;
        debug!("browser session closed");
    }
}

impl Drop for ChromeSession {
    // Cancelled calls never reach `close`; chromiumoxide kills the child
    // process when `Browser` drops, the CDP handler task is ours to stop.
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
