//! LinkText - turn a URL into normalized, budgeted text
//!
//! This crate fetches a link, extracts its readable content and metadata,
//! resolves a transcript for media links and applies a character budget.
//!
//! ## Strategies
//!
//! [`fetch_link_content`] tries an [`EnhancedFetch`] service (Firecrawl)
//! when configured, then falls back to a direct HTML fetch through the
//! injected [`HttpFetch`] transport.
//!
//! ## Transcripts
//!
//! [`resolve_transcript_for_link`] picks one [`TranscriptProvider`] from the
//! [`ProviderRegistry`]:
//! - `youtube` - caption tracks from the player configuration
//! - `podcast` - Podcasting 2.0 `<podcast:transcript>` feeds
//! - `generic` - `<track>` caption files embedded in the page
//!
//! Results are cached through a [`TranscriptCacheStore`] and a stale entry
//! is returned as a fallback when a provider comes back empty.

mod article;
mod budget;
mod cache;
mod captions;
mod client;
mod content;
mod convert;
mod enhanced;
mod error;
mod metadata;
mod progress;
pub mod providers;
mod resolver;
mod transcript;
mod transport;
mod types;

pub use article::{extract_article_content, strip_leading_title};
pub use budget::{apply_budget, count_words, text_stats, Budgeted, TextStats};
pub use cache::{
    CachePolicy, FileTranscriptCache, MemoryTranscriptCache, TranscriptCache,
    TranscriptCacheStore,
};
pub use captions::{format_timestamp, parse_cues, render_timed};
pub use client::{LinkClient, LinkClientBuilder};
pub use content::{fetch_link_content, ContentDeps, ContentOptions, TRANSCRIPT_MARKER};
pub use convert::{html_to_text, normalize_for_prompt};
pub use enhanced::{EnhancedFetch, EnhancedPage, FirecrawlClient, DEFAULT_FIRECRAWL_BASE_URL};
pub use error::LinkError;
pub use metadata::{extract_metadata_from_html, pick_first_text, PageMetadata};
pub use progress::{NoopProgress, ProgressEvent, ProgressKind, ProgressSink};
pub use providers::{
    Credentials, ProviderRegistry, TranscriptProvider, YoutubeTranscriptMode,
};
pub use resolver::{extract_youtube_video_id, normalize_url, resolve_resource};
pub use transcript::{resolve_transcript_for_link, TranscriptDeps, TranscriptOptions};
pub use transport::{HttpFetch, HttpResponse, RequestOptions, ReqwestTransport};
pub use types::{
    CacheMode, CacheStatus, CachedTranscriptEntry, ContentDiagnostics, ContentStrategy,
    ExtractedLinkContent, FetchDiagnostics, HttpMethod, ProviderContext, ProviderResult,
    ResourceReference, TranscriptDiagnostics, TranscriptMetadata, TranscriptResolution,
    TranscriptSegment,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns LinkText/1.0";
