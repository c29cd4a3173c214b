//! Static rendering engine
//!
//! Loads documents without executing scripts: `data:text/html,<markup>` URLs
//! inline, `http(s)` URLs over reqwest. Enough for server-rendered job boards.

use crate::{map_reqwest_error, user_agent};
use async_trait::async_trait;
use jobharvest_core::error::{AppError, Result};
use jobharvest_core::port::{RenderingEngine, RenderingSession};
use std::time::Duration;
use tracing::debug;

/// Engine name served by [`StaticRenderingEngine`]
pub const STATIC_ENGINE: &str = "static";

const DATA_HTML_PREFIX: &str = "data:text/html,";

pub struct StaticRenderingEngine {
    client: reqwest::Client,
}

impl StaticRenderingEngine {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RenderingEngine for StaticRenderingEngine {
    async fn open(&self, engine: &str) -> Result<Box<dyn RenderingSession>> {
        if engine != STATIC_ENGINE {
            return Err(AppError::Config(format!(
                "Unsupported rendering engine '{engine}'"
            )));
        }

        Ok(Box::new(StaticSession {
            client: self.client.clone(),
            document: None,
            closed: false,
        }))
    }
}

struct StaticSession {
    client: reqwest::Client,
    document: Option<String>,
    closed: bool,
}

impl StaticSession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(AppError::InvalidState("rendering session is closed".into()));
        }
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| map_reqwest_error(url, e))?;

        response.text().await.map_err(|e| map_reqwest_error(url, e))
    }
}

#[async_trait]
impl RenderingSession for StaticSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.ensure_open()?;

        let document = if let Some(markup) = url.strip_prefix(DATA_HTML_PREFIX) {
            markup.to_string()
        } else if url.starts_with("http://") || url.starts_with("https://") {
            debug!(url = %url, "Fetching document");
            self.fetch(url).await?
        } else {
            return Err(AppError::Validation(format!("Unsupported URL scheme: {url}")));
        };

        self.document = Some(document);
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.ensure_open()?;
        self.document
            .clone()
            .ok_or_else(|| AppError::InvalidState("no document loaded".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.document = None;
        Ok(())
    }
}
