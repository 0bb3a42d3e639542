use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::parser::block::document_text;

const USER_AGENT: &str = concat!("covid_fr_tracker/", env!("CARGO_PKG_VERSION"));

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub markup: String,
}

impl Page {
    /// Parsed-text view of the markup.
    pub fn text(&self) -> String {
        document_text(&self.markup)
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Shared client for the page and, in image mode, the OCR download.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page> {
        info!("Processing {}...", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status);
        }

        let markup = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(Page {
            url: url.clone(),
            markup,
        })
    }
}
