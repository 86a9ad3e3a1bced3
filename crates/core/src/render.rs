//! Page renderer strategies.
//!
//! Two interchangeable ways to turn a URL into final HTML: [`HttpFetcher`]
//! issues a direct GET with no script execution, while [`BrowserRenderer`]
//! drives a headless browser through chromiumoxide. The pipeline composes
//! them sequentially (try the browser, fall back to the fetch once) rather
//! than dispatching polymorphically over the fallback.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::config::Config;
use crate::{ClipvaultError, Result};

/// Final HTML for a page plus the URL extraction should resolve against.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// The post-redirect URL for the browser strategy; the originally
    /// requested URL for the fetch strategy.
    pub final_url: String,
}

/// Strategy interface: one method, two implementations.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn fetch_rendered(&self, url: &str) -> Result<RenderedPage>;
}

/// Creates the shared renderer handle for a batch.
///
/// The pipeline calls `launch` lazily, on the first render-dispatched task
/// of a batch, and closes the returned handle once the batch drains.
#[async_trait]
pub trait RendererLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderHandle>>;
}

/// A live shared renderer, torn down at the end of every batch.
#[async_trait]
pub trait RenderHandle: PageRenderer {
    async fn close(self: Box<Self>);
}

fn is_html_content_type(content_type: &str) -> bool {
    let ct = content_type.to_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml+xml")
}

/// Direct network fetch of raw HTML, no rendering.
pub struct HttpFetcher {
    client: Client,
    timeout: u64,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, timeout: config.timeout })
    }

    /// The underlying HTTP client, shared with best-effort metadata lookups.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageRenderer for HttpFetcher {
    async fn fetch_rendered(&self, url: &str) -> Result<RenderedPage> {
        let parsed = Url::parse(url).map_err(|e| ClipvaultError::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClipvaultError::Timeout { timeout: self.timeout }
                } else {
                    ClipvaultError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipvaultError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html_content_type(&content_type) {
            return Err(ClipvaultError::NotHtml(content_type));
        }

        let html = response.text().await?;

        // The fetch strategy does not resolve redirects beyond what the
        // client follows itself; the requested URL stays the base.
        Ok(RenderedPage { html, final_url: url.to_string() })
    }
}

/// Full browser rendering via a shared headless instance.
///
/// At most one of these exists per batch; pages (tabs) are opened and
/// closed per task.
pub struct BrowserRenderer {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    timeout: u64,
}

impl BrowserRenderer {
    pub async fn launch(config: &Config) -> Result<Self> {
        let browser_config = BrowserConfig::builder()
            .build()
            .map_err(ClipvaultError::Render)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ClipvaultError::Render(e.to_string()))?;

        // The CDP event stream must be drained for the connection to stay
        // alive; the task ends when the browser closes.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self { browser, handler_task, timeout: config.timeout })
    }

    async fn capture(&self, page: &Page, url: &str) -> Result<RenderedPage> {
        page.goto(url).await.map_err(|e| ClipvaultError::Render(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ClipvaultError::Render(e.to_string()))?;

        // The response's declared document type, as the browser saw it.
        let content_type: String = page
            .evaluate("document.contentType")
            .await
            .map_err(|e| ClipvaultError::Render(e.to_string()))?
            .into_value()
            .unwrap_or_default();
        if !content_type.is_empty() && !content_type.to_lowercase().contains("html") {
            return Err(ClipvaultError::NotHtml(content_type));
        }

        let final_url = page
            .url()
            .await
            .map_err(|e| ClipvaultError::Render(e.to_string()))?
            .unwrap_or_else(|| url.to_string());
        let html = page.content().await.map_err(|e| ClipvaultError::Render(e.to_string()))?;

        Ok(RenderedPage { html, final_url })
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn fetch_rendered(&self, url: &str) -> Result<RenderedPage> {
        let attempt = async {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| ClipvaultError::Render(e.to_string()))?;
            let result = self.capture(&page, url).await;
            let _ = page.close().await;
            result
        };

        match tokio::time::timeout(Duration::from_secs(self.timeout), attempt).await {
            Ok(result) => result,
            Err(_) => Err(ClipvaultError::Timeout { timeout: self.timeout }),
        }
    }
}

#[async_trait]
impl RenderHandle for BrowserRenderer {
    async fn close(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Browser did not close cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

/// Default launcher for the browser strategy.
#[derive(Debug, Default)]
pub struct ChromiumLauncher {
    config: Config,
}

impl ChromiumLauncher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RendererLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderHandle>> {
        let renderer = BrowserRenderer::launch(&self.config).await?;
        Ok(Box::new(renderer))
    }
}
