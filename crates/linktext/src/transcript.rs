//! Transcript resolution
//!
//! Cache lookup, provider dispatch with progress events, cache write and
//! stale-cache fallback for a single link.

use crate::cache::{fold_segments, DiagnosticsSeed, TranscriptCache};
use crate::error::LinkError;
use crate::progress::{emit, ProgressEvent, ProgressSink};
use crate::providers::{Credentials, ProviderFetchOptions, ProviderRegistry, YoutubeTranscriptMode};
use crate::resolver::resolve_resource;
use crate::transport::HttpFetch;
use crate::types::{
    CacheMode, CacheStatus, CachedTranscriptEntry, Notes, ProviderContext, ProviderResult,
    TranscriptDiagnostics, TranscriptResolution,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Collaborators used by transcript resolution
#[derive(Clone)]
pub struct TranscriptDeps {
    pub transport: Arc<dyn HttpFetch>,
    /// Without a cache every lookup reports `unknown`
    pub cache: Option<TranscriptCache>,
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub credentials: Credentials,
    pub registry: ProviderRegistry,
}

impl TranscriptDeps {
    /// Default registry, no cache, no progress sink
    pub fn new(transport: Arc<dyn HttpFetch>) -> Self {
        Self {
            transport,
            cache: None,
            progress: None,
            credentials: Credentials::new(),
            registry: ProviderRegistry::with_defaults(),
        }
    }

    pub fn with_cache(mut self, cache: TranscriptCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// Per-call transcript options
#[derive(Debug, Clone, Default)]
pub struct TranscriptOptions {
    pub cache_mode: CacheMode,
    /// Request timed segments
    pub timestamps: bool,
    /// Modification time of a local source file; older cache entries are ignored
    pub file_mtime: Option<DateTime<Utc>>,
    pub youtube_mode: YoutubeTranscriptMode,
}

/// Resolve the transcript for a link
///
/// `html` is the already fetched page markup, if any. Only configuration
/// errors are returned; every fetch problem ends up in the diagnostics.
pub async fn resolve_transcript_for_link(
    url: &str,
    html: Option<&str>,
    deps: &TranscriptDeps,
    options: &TranscriptOptions,
) -> Result<TranscriptResolution, LinkError> {
    let resource = resolve_resource(url, html);
    let context = ProviderContext {
        url: resource.effective_url.clone(),
        html: html.map(str::to_string),
        resource_key: resource.resource_key.clone(),
    };

    let provider = deps.registry.select(&context)?;

    let (cached, seed) = match &deps.cache {
        Some(cache) => {
            let read = cache
                .read(
                    &context.url,
                    options.cache_mode,
                    options.timestamps,
                    options.file_mtime,
                )
                .await;
            if let Some(resolution) = read.resolution {
                return Ok(resolution);
            }
            (read.cached, read.seed)
        }
        None => (
            None,
            DiagnosticsSeed {
                cache_mode: options.cache_mode,
                cache_status: CacheStatus::Unknown,
                notes: Notes::new(),
            },
        ),
    };

    let progress = deps.progress.as_deref();
    if provider.reports_progress() {
        emit(
            progress,
            ProgressEvent::start(&context.url, provider.name(), provider.start_hint()),
        );
    }

    let fetch_options = ProviderFetchOptions {
        transport: deps.transport.as_ref(),
        credentials: &deps.credentials,
        youtube_mode: options.youtube_mode,
        timestamps: options.timestamps,
        progress,
    };
    let result = provider.fetch_transcript(&context, fetch_options).await;
    let ok = result.text.is_some();
    debug!(
        provider = provider.name(),
        url = %context.url,
        source = ?result.source,
        ok,
        "Transcript provider finished"
    );

    if provider.reports_progress() {
        emit(
            progress,
            ProgressEvent::done(
                &context.url,
                provider.name(),
                provider.done_hint(ok),
                ok,
                result.source.clone(),
            ),
        );
    }

    if let Some(cache) = &deps.cache {
        cache
            .write(
                &context.url,
                provider.name(),
                context.resource_key.as_deref(),
                &result,
                options.timestamps,
                options.file_mtime,
            )
            .await;
    }

    let notes = seed
        .notes
        .merge(Notes::from_joined(result.notes.as_deref()));

    match cached {
        Some(entry) if !ok && options.cache_mode != CacheMode::Bypass => {
            Ok(fallback(entry, result, notes, options))
        }
        _ => Ok(direct(result, seed.cache_mode, seed.cache_status, notes, options)),
    }
}

fn fallback(
    entry: CachedTranscriptEntry,
    result: ProviderResult,
    notes: Notes,
    options: &TranscriptOptions,
) -> TranscriptResolution {
    debug!(source = ?entry.source, "Falling back to cached transcript");
    let notes = notes.with("Falling back to cached transcript after provider returned no text");
    let segments = if options.timestamps {
        entry.metadata.segments.clone()
    } else {
        None
    };
    TranscriptResolution {
        text: entry.content.clone(),
        source: entry.source.clone(),
        segments,
        diagnostics: TranscriptDiagnostics {
            cache_mode: options.cache_mode,
            cache_status: CacheStatus::Fallback,
            text_provided: entry.content.is_some(),
            provider: entry.source.clone(),
            attempted_providers: result.attempted_providers,
            notes: notes.joined(),
        },
        metadata: Some(entry.metadata),
    }
}

fn direct(
    result: ProviderResult,
    cache_mode: CacheMode,
    cache_status: CacheStatus,
    notes: Notes,
    options: &TranscriptOptions,
) -> TranscriptResolution {
    let metadata = fold_segments(
        result.metadata,
        result.segments.as_deref(),
        options.timestamps,
    );
    let segments = if options.timestamps {
        result.segments.filter(|s| !s.is_empty())
    } else {
        None
    };
    TranscriptResolution {
        diagnostics: TranscriptDiagnostics {
            cache_mode,
            cache_status,
            text_provided: result.text.is_some(),
            provider: result.source.clone(),
            attempted_providers: result.attempted_providers,
            notes: notes.joined(),
        },
        text: result.text,
        source: result.source,
        metadata: Some(metadata),
        segments,
    }
}
