//! Configured client for LinkText
//!
//! [`LinkClient`] bundles the transport, cache, enhanced fetch service,
//! progress sink and provider registry behind the two entry points
//! [`LinkClient::fetch`] and [`LinkClient::transcript`].

use crate::cache::{CachePolicy, FileTranscriptCache, TranscriptCache, TranscriptCacheStore};
use crate::content::{fetch_link_content, ContentDeps, ContentOptions};
use crate::enhanced::{EnhancedFetch, FirecrawlClient};
use crate::error::LinkError;
use crate::progress::ProgressSink;
use crate::providers::{Credentials, ProviderRegistry};
use crate::transcript::{resolve_transcript_for_link, TranscriptDeps, TranscriptOptions};
use crate::transport::{HttpFetch, ReqwestTransport};
use crate::types::{ExtractedLinkContent, TranscriptResolution};
use schemars::schema_for;
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for configuring a [`LinkClient`]
#[derive(Clone, Default)]
pub struct LinkClientBuilder {
    /// Custom User-Agent for the default transport
    user_agent: Option<String>,
    /// Replaces the default reqwest transport
    transport: Option<Arc<dyn HttpFetch>>,
    firecrawl_api_key: Option<String>,
    firecrawl_base_url: Option<String>,
    /// Replaces the Firecrawl client
    enhanced: Option<Arc<dyn EnhancedFetch>>,
    cache_store: Option<Arc<dyn TranscriptCacheStore>>,
    cache_dir: Option<PathBuf>,
    cache_policy: CachePolicy,
    progress: Option<Arc<dyn ProgressSink>>,
    credentials: Credentials,
    registry: Option<ProviderRegistry>,
    /// Allow list of URL prefixes
    allow_prefixes: Vec<String>,
    /// Block list of URL prefixes
    block_prefixes: Vec<String>,
    defaults: ContentOptions,
}

impl LinkClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded from the process environment
    ///
    /// Reads `FIRECRAWL_API_KEY`, `FIRECRAWL_BASE_URL`, `LINKTEXT_CACHE_DIR`
    /// and `LINKTEXT_USER_AGENT`. Empty values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut builder = Self::new();
        builder.firecrawl_api_key = var("FIRECRAWL_API_KEY");
        builder.firecrawl_base_url = var("FIRECRAWL_BASE_URL");
        builder.cache_dir = var("LINKTEXT_CACHE_DIR").map(PathBuf::from);
        builder.user_agent = var("LINKTEXT_USER_AGENT");
        builder
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Use a custom HTTP transport instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn HttpFetch>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Enable the Firecrawl enhanced fetch service
    pub fn firecrawl_api_key(mut self, key: impl Into<String>) -> Self {
        self.firecrawl_api_key = Some(key.into());
        self
    }

    pub fn firecrawl_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.firecrawl_base_url = Some(base_url.into());
        self
    }

    /// Use a custom enhanced fetch service
    pub fn enhanced(mut self, enhanced: Arc<dyn EnhancedFetch>) -> Self {
        self.enhanced = Some(enhanced);
        self
    }

    /// Store transcripts in the given cache store
    pub fn cache_store(mut self, store: Arc<dyn TranscriptCacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Store transcripts as JSON files under `dir`
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Credentials passed unmodified to transcript providers
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add URL prefix to allow list
    pub fn allow_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.allow_prefixes.push(prefix.into());
        self
    }

    /// Add URL prefix to block list
    pub fn block_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.block_prefixes.push(prefix.into());
        self
    }

    /// Options used by [`LinkClient::fetch`]
    pub fn default_options(mut self, options: ContentOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<LinkClient, LinkError> {
        let transport: Arc<dyn HttpFetch> = match self.transport {
            Some(transport) => transport,
            None => match self.user_agent.as_deref() {
                Some(ua) => Arc::new(ReqwestTransport::with_user_agent(ua)?),
                None => Arc::new(ReqwestTransport::new()?),
            },
        };

        let enhanced = self.enhanced.or_else(|| {
            self.firecrawl_api_key.map(|key| {
                let client = FirecrawlClient::new(transport.clone(), key);
                let client = match self.firecrawl_base_url {
                    Some(base_url) => client.with_base_url(base_url),
                    None => client,
                };
                Arc::new(client) as Arc<dyn EnhancedFetch>
            })
        });

        let store = self.cache_store.or_else(|| {
            self.cache_dir
                .map(|dir| Arc::new(FileTranscriptCache::new(dir)) as Arc<dyn TranscriptCacheStore>)
        });
        let cache = store.map(|store| TranscriptCache::new(store).with_policy(self.cache_policy));

        let transcript = TranscriptDeps {
            transport,
            cache,
            progress: self.progress,
            credentials: self.credentials,
            registry: self.registry.unwrap_or_default(),
        };

        Ok(LinkClient {
            deps: ContentDeps {
                transcript,
                enhanced,
            },
            allow_prefixes: self.allow_prefixes,
            block_prefixes: self.block_prefixes,
            defaults: self.defaults,
        })
    }
}

/// Configured LinkText client
#[derive(Clone)]
pub struct LinkClient {
    deps: ContentDeps,
    allow_prefixes: Vec<String>,
    block_prefixes: Vec<String>,
    defaults: ContentOptions,
}

impl LinkClient {
    /// Create a new client builder
    pub fn builder() -> LinkClientBuilder {
        LinkClientBuilder::new()
    }

    /// Get output schema as JSON
    pub fn output_schema(&self) -> serde_json::Value {
        let schema = schema_for!(ExtractedLinkContent);
        serde_json::to_value(schema).unwrap_or_default()
    }

    pub fn has_enhanced(&self) -> bool {
        self.deps.enhanced.is_some()
    }

    pub fn has_cache(&self) -> bool {
        self.deps.transcript.cache.is_some()
    }

    fn check_url(&self, url: &str) -> Result<(), LinkError> {
        let url = url.trim();
        if !self.allow_prefixes.is_empty()
            && !self.allow_prefixes.iter().any(|prefix| url.starts_with(prefix))
        {
            return Err(LinkError::BlockedUrl);
        }
        if self.block_prefixes.iter().any(|prefix| url.starts_with(prefix)) {
            return Err(LinkError::BlockedUrl);
        }
        Ok(())
    }

    /// Extract content with the client's default options
    pub async fn fetch(&self, url: &str) -> Result<ExtractedLinkContent, LinkError> {
        self.fetch_with(url, &self.defaults).await
    }

    /// Extract content with explicit options
    pub async fn fetch_with(
        &self,
        url: &str,
        options: &ContentOptions,
    ) -> Result<ExtractedLinkContent, LinkError> {
        self.check_url(url)?;
        fetch_link_content(url, options, &self.deps).await
    }

    /// Resolve only the transcript for a link
    pub async fn transcript(
        &self,
        url: &str,
        html: Option<&str>,
        options: &TranscriptOptions,
    ) -> Result<TranscriptResolution, LinkError> {
        self.check_url(url)?;
        resolve_transcript_for_link(url, html, &self.deps.transcript, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTranscriptCache;
    use std::collections::HashMap;

    #[test]
    fn test_builder_defaults() {
        let client = LinkClient::builder().build().unwrap();
        assert!(!client.has_enhanced());
        assert!(!client.has_cache());
    }

    #[test]
    fn test_builder_wires_firecrawl_and_cache() {
        let client = LinkClient::builder()
            .firecrawl_api_key("fc-test")
            .cache_store(Arc::new(MemoryTranscriptCache::new()))
            .build()
            .unwrap();
        assert!(client.has_enhanced());
        assert!(client.has_cache());
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("FIRECRAWL_API_KEY", "fc-key"),
            ("FIRECRAWL_BASE_URL", "http://localhost:3002"),
            ("LINKTEXT_CACHE_DIR", "/tmp/linktext"),
            ("LINKTEXT_USER_AGENT", "  "),
        ]
        .into_iter()
        .collect();
        let builder = LinkClientBuilder::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(builder.firecrawl_api_key.as_deref(), Some("fc-key"));
        assert_eq!(
            builder.firecrawl_base_url.as_deref(),
            Some("http://localhost:3002")
        );
        assert_eq!(builder.cache_dir, Some(PathBuf::from("/tmp/linktext")));
        assert_eq!(builder.user_agent, None);
    }

    #[test]
    fn test_allow_and_block_prefixes() {
        let client = LinkClient::builder()
            .allow_prefix("https://allowed.example.com")
            .block_prefix("https://allowed.example.com/private")
            .build()
            .unwrap();

        let result = tokio_test::block_on(client.fetch("https://other.example.com/"));
        assert!(matches!(result, Err(LinkError::BlockedUrl)));

        let result =
            tokio_test::block_on(client.fetch("https://allowed.example.com/private/page"));
        assert!(matches!(result, Err(LinkError::BlockedUrl)));
    }

    #[test]
    fn test_output_schema() {
        let client = LinkClient::builder().build().unwrap();
        let schema = client.output_schema();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("content"));
        assert!(props.contains_key("truncated"));
        assert!(props.contains_key("diagnostics"));
    }
}
