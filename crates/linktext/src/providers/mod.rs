//! Transcript providers
//!
//! Design: a closed set of providers sharing two operations, `can_handle`
//! (synchronous, no I/O) and `fetch_transcript` (never fails). The
//! registry checks specialized providers in priority order and falls back
//! to the generic provider.

mod generic;
mod podcast;
mod youtube;

use crate::error::LinkError;
use crate::progress::ProgressSink;
use crate::transport::HttpFetch;
use crate::types::{ProviderContext, ProviderResult};
use std::collections::BTreeMap;
use std::str::FromStr;

pub use podcast::is_podcast_url;

/// Opaque credentials handed unmodified to providers
#[derive(Clone, Default)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys only
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Which YouTube sub-strategies may run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum YoutubeTranscriptMode {
    /// Captions from the supplied page, then from a fetched watch page
    #[default]
    Auto,
    /// Always fetch the watch page
    Web,
    /// Only use the supplied page markup
    Embedded,
}

impl FromStr for YoutubeTranscriptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "web" => Ok(Self::Web),
            "embedded" => Ok(Self::Embedded),
            _ => Err("Invalid YouTube mode: must be auto, web or embedded".to_string()),
        }
    }
}

/// Option bag passed to every provider fetch
#[derive(Clone, Copy)]
pub struct ProviderFetchOptions<'a> {
    pub transport: &'a dyn HttpFetch,
    pub credentials: &'a Credentials,
    pub youtube_mode: YoutubeTranscriptMode,
    pub timestamps: bool,
    pub progress: Option<&'a dyn ProgressSink>,
}

/// Transcript provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptProvider {
    Youtube,
    Podcast,
    /// Handles everything; must always be registered
    Generic,
}

impl TranscriptProvider {
    /// Unique identifier, also used as the cache `service`
    pub fn name(&self) -> &'static str {
        match self {
            TranscriptProvider::Youtube => "youtube",
            TranscriptProvider::Podcast => "podcast",
            TranscriptProvider::Generic => "generic",
        }
    }

    /// Returns true if this provider can handle the context
    pub fn can_handle(&self, context: &ProviderContext) -> bool {
        match self {
            TranscriptProvider::Youtube => youtube::can_handle(context),
            TranscriptProvider::Podcast => podcast::can_handle(context),
            TranscriptProvider::Generic => true,
        }
    }

    /// Fetch a transcript; misses come back as empty results with notes
    pub async fn fetch_transcript(
        &self,
        context: &ProviderContext,
        options: ProviderFetchOptions<'_>,
    ) -> ProviderResult {
        match self {
            TranscriptProvider::Youtube => youtube::fetch_transcript(context, options).await,
            TranscriptProvider::Podcast => podcast::fetch_transcript(context, options).await,
            TranscriptProvider::Generic => generic::fetch_transcript(context, options).await,
        }
    }

    /// Media providers report transcript progress, the generic one is silent
    pub fn reports_progress(&self) -> bool {
        !matches!(self, TranscriptProvider::Generic)
    }

    pub fn start_hint(&self) -> &'static str {
        match self {
            TranscriptProvider::Youtube => "YouTube: fetching transcript",
            TranscriptProvider::Podcast => "Podcast: fetching transcript",
            TranscriptProvider::Generic => "Fetching transcript",
        }
    }

    pub fn done_hint(&self, ok: bool) -> String {
        let label = match self {
            TranscriptProvider::Youtube => "YouTube",
            TranscriptProvider::Podcast => "Podcast",
            TranscriptProvider::Generic => "Page",
        };
        if ok {
            format!("{}: transcript ready", label)
        } else {
            format!("{}: no transcript", label)
        }
    }
}

/// Ordered provider list
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<TranscriptProvider>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry with youtube, podcast and generic providers, in that order
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TranscriptProvider::Youtube);
        registry.register(TranscriptProvider::Podcast);
        registry.register(TranscriptProvider::Generic);
        registry
    }

    /// Register a provider; specialized providers are checked in registration order
    pub fn register(&mut self, provider: TranscriptProvider) {
        if !self.providers.contains(&provider) {
            self.providers.push(provider);
        }
    }

    pub fn providers(&self) -> &[TranscriptProvider] {
        &self.providers
    }

    /// Select exactly one provider for the context
    ///
    /// Fails only when the generic provider is missing, which is a
    /// configuration error.
    pub fn select(&self, context: &ProviderContext) -> Result<TranscriptProvider, LinkError> {
        let specialized = self
            .providers
            .iter()
            .filter(|p| **p != TranscriptProvider::Generic)
            .find(|p| p.can_handle(context));

        if let Some(provider) = specialized {
            tracing::debug!(provider = provider.name(), url = %context.url, "Using transcript provider");
            return Ok(*provider);
        }

        self.providers
            .iter()
            .find(|p| **p == TranscriptProvider::Generic)
            .copied()
            .ok_or(LinkError::MissingGenericProvider)
    }
}
