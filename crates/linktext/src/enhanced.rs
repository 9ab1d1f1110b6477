//! Enhanced fetch service
//!
//! A managed scraping service returning markdown, raw HTML and structured
//! metadata. [`FirecrawlClient`] talks to the Firecrawl `/v1/scrape` API
//! through the injected transport.

use crate::error::LinkError;
use crate::metadata::PageMetadata;
use crate::transport::{HttpFetch, RequestOptions};
use crate::types::CacheMode;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Default Firecrawl API endpoint
pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";

/// Page returned by an enhanced fetch service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancedPage {
    pub markdown: String,
    pub html: Option<String>,
    pub metadata: PageMetadata,
}

/// Managed scraping capability
///
/// `Ok(None)` means the service had nothing for this URL.
#[async_trait]
pub trait EnhancedFetch: Send + Sync {
    async fn scrape(
        &self,
        url: &str,
        cache_mode: CacheMode,
    ) -> Result<Option<EnhancedPage>, LinkError>;
}

/// Firecrawl scrape client
#[derive(Clone)]
pub struct FirecrawlClient {
    transport: Arc<dyn HttpFetch>,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FirecrawlClient {
    pub fn new(transport: Arc<dyn HttpFetch>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            base_url: DEFAULT_FIRECRAWL_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(url: &str, cache_mode: CacheMode) -> String {
        let mut body = json!({
            "url": url,
            "formats": ["markdown", "rawHtml"],
            "onlyMainContent": true,
        });
        if cache_mode == CacheMode::Bypass {
            body["maxAge"] = json!(0);
        }
        body.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    raw_html: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    metadata: ScrapeMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    og_site_name: Option<String>,
}

impl From<ScrapeData> for EnhancedPage {
    fn from(data: ScrapeData) -> Self {
        EnhancedPage {
            markdown: data.markdown.unwrap_or_default(),
            html: data.raw_html.or(data.html),
            metadata: PageMetadata {
                title: data.metadata.title,
                description: data.metadata.description,
                site_name: data.metadata.og_site_name,
            },
        }
    }
}

#[async_trait]
impl EnhancedFetch for FirecrawlClient {
    async fn scrape(
        &self,
        url: &str,
        cache_mode: CacheMode,
    ) -> Result<Option<EnhancedPage>, LinkError> {
        let endpoint = format!("{}/v1/scrape", self.base_url);
        let request = RequestOptions::post_json(Self::request_body(url, cache_mode))
            .header("authorization", format!("Bearer {}", self.api_key));

        debug!(url = %url, "Calling Firecrawl scrape");
        let response = self.transport.fetch(&endpoint, &request).await?;
        if !response.is_success() {
            return Err(LinkError::Enhanced(format!(
                "scrape returned status {}",
                response.status
            )));
        }

        let parsed: ScrapeResponse = serde_json::from_slice(&response.body)
            .map_err(|e| LinkError::Enhanced(format!("invalid scrape response: {}", e)))?;
        if !parsed.success {
            return Err(LinkError::Enhanced(
                parsed.error.unwrap_or_else(|| "scrape unsuccessful".to_string()),
            ));
        }

        Ok(parsed.data.map(EnhancedPage::from))
    }
}
