//! Link content extraction
//!
//! Two strategies: the enhanced fetch service when configured, then a
//! direct HTML fetch. Both feed the same finalization step that merges the
//! transcript, applies the character budget and records diagnostics.

use crate::article::{extract_article_content, strip_leading_title};
use crate::budget::{apply_budget, count_words, text_stats};
use crate::captions::render_timed;
use crate::convert::{is_html, normalize_for_prompt};
use crate::enhanced::{EnhancedFetch, EnhancedPage};
use crate::error::LinkError;
use crate::metadata::{
    extract_metadata_from_html, extract_youtube_short_description, pick_first_text, PageMetadata,
};
use crate::providers::YoutubeTranscriptMode;
use crate::resolver::{bare_hostname, normalize_url};
use crate::transcript::{resolve_transcript_for_link, TranscriptDeps, TranscriptOptions};
use crate::transport::{is_binary_content_type, RequestOptions};
use crate::types::{
    CacheMode, ContentDiagnostics, ContentStrategy, ExtractedLinkContent, FetchDiagnostics, Notes,
    TranscriptResolution,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Marker introducing transcript text in assembled content
pub const TRANSCRIPT_MARKER: &str = "Transcript:\n";

/// Per-call extraction options
#[derive(Debug, Clone)]
pub struct ContentOptions {
    /// Character budget; `None` is unlimited
    pub max_characters: Option<usize>,
    pub cache_mode: CacheMode,
    /// Render the transcript as `[m:ss] text` lines when segments exist
    pub timestamps: bool,
    pub file_mtime: Option<DateTime<Utc>>,
    pub youtube_mode: YoutubeTranscriptMode,
    /// Try the enhanced fetch service before the direct HTML fetch
    pub use_enhanced: bool,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            max_characters: None,
            cache_mode: CacheMode::Default,
            timestamps: false,
            file_mtime: None,
            youtube_mode: YoutubeTranscriptMode::Auto,
            use_enhanced: true,
        }
    }
}

impl ContentOptions {
    fn transcript_options(&self) -> TranscriptOptions {
        TranscriptOptions {
            cache_mode: self.cache_mode,
            timestamps: self.timestamps,
            file_mtime: self.file_mtime,
            youtube_mode: self.youtube_mode,
        }
    }
}

/// Collaborators used by content extraction
#[derive(Clone)]
pub struct ContentDeps {
    pub transcript: TranscriptDeps,
    pub enhanced: Option<Arc<dyn EnhancedFetch>>,
}

impl ContentDeps {
    pub fn new(transcript: TranscriptDeps) -> Self {
        Self {
            transcript,
            enhanced: None,
        }
    }

    pub fn with_enhanced(mut self, enhanced: Arc<dyn EnhancedFetch>) -> Self {
        self.enhanced = Some(enhanced);
        self
    }
}

/// Validate and normalize the requested URL
fn validate_url(raw: &str) -> Result<String, LinkError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkError::MissingUrl);
    }
    let parsed = Url::parse(trimmed).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LinkError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(normalize_url(trimmed))
}

/// Fetch a link and return normalized, budgeted text
///
/// "No content" is not an error: the result carries empty fields and
/// diagnostics notes instead.
pub async fn fetch_link_content(
    url: &str,
    options: &ContentOptions,
    deps: &ContentDeps,
) -> Result<ExtractedLinkContent, LinkError> {
    let url = validate_url(url)?;
    let mut fetch = FetchDiagnostics::default();
    let mut notes = Notes::new();

    if let Some(enhanced) = deps.enhanced.as_ref().filter(|_| options.use_enhanced) {
        fetch.enhanced_attempted = true;
        match enhanced.scrape(&url, options.cache_mode).await {
            Ok(Some(page)) => {
                let markdown = normalize_for_prompt(&page.markdown);
                if !markdown.is_empty() {
                    info!(url = %url, "Using enhanced fetch content");
                    fetch.enhanced_used = true;
                    return firecrawl_strategy(&url, page, markdown, options, deps, fetch, notes)
                        .await;
                }
                notes.push("Enhanced fetch returned empty content");
            }
            Ok(None) => notes.push("Enhanced fetch returned no page"),
            Err(e) => {
                warn!(url = %url, error = %e, "Enhanced fetch failed, using HTML");
                notes.push(e.to_string());
            }
        }
    }

    html_strategy(&url, options, deps, fetch, notes).await
}

async fn firecrawl_strategy(
    url: &str,
    page: EnhancedPage,
    markdown: String,
    options: &ContentOptions,
    deps: &ContentDeps,
    fetch: FetchDiagnostics,
    notes: Notes,
) -> Result<ExtractedLinkContent, LinkError> {
    let transcript = resolve_transcript_for_link(
        url,
        page.html.as_deref(),
        &deps.transcript,
        &options.transcript_options(),
    )
    .await?;

    let parsed = page
        .html
        .as_deref()
        .map(extract_metadata_from_html)
        .unwrap_or_default();
    let metadata = merge_metadata(url, &[&page.metadata, &parsed]);

    let base = transcript_text(&transcript).unwrap_or(markdown);

    Ok(finalize(
        url,
        metadata,
        base,
        transcript,
        ContentStrategy::Firecrawl,
        fetch,
        notes,
        options,
    ))
}

async fn html_strategy(
    url: &str,
    options: &ContentOptions,
    deps: &ContentDeps,
    mut fetch: FetchDiagnostics,
    mut notes: Notes,
) -> Result<ExtractedLinkContent, LinkError> {
    info!(url = %url, "Fetching HTML");
    let response = deps
        .transcript
        .transport
        .fetch(url, &RequestOptions::get().header("accept", "text/html, text/plain, */*;q=0.8"))
        .await?;
    fetch.http_status = Some(response.status);

    if !response.is_success() {
        return Err(LinkError::HttpStatus {
            status: response.status,
            url: url.to_string(),
        });
    }
    if let Some(content_type) = response.content_type() {
        if is_binary_content_type(content_type) {
            return Err(LinkError::UnsupportedContent(content_type.to_string()));
        }
    }
    if response.truncated {
        notes.push("Body read timed out; content is partial");
    }

    let body = response.text();
    let html = is_html(response.content_type(), &body).then_some(body.as_str());

    let (page_metadata, article) = match html {
        Some(html) => (extract_metadata_from_html(html), extract_article_content(html)),
        None => (PageMetadata::default(), normalize_for_prompt(&body)),
    };
    let metadata = merge_metadata(url, &[&page_metadata]);

    let transcript =
        resolve_transcript_for_link(url, html, &deps.transcript, &options.transcript_options())
            .await?;

    let base = match transcript_text(&transcript) {
        Some(text) => text,
        None => match html
            .and_then(extract_youtube_short_description)
            .map(|d| normalize_for_prompt(&d))
            .filter(|d| !d.is_empty())
        {
            Some(description) => description,
            None => strip_leading_title(&article, metadata.title.as_deref()),
        },
    };

    Ok(finalize(
        url,
        metadata,
        base,
        transcript,
        ContentStrategy::Html,
        fetch,
        notes,
        options,
    ))
}

/// Merge metadata sources field by field, earlier sources first
fn merge_metadata(url: &str, sources: &[&PageMetadata]) -> PageMetadata {
    let title: Vec<Option<&str>> = sources.iter().map(|m| m.title.as_deref()).collect();
    let description: Vec<Option<&str>> =
        sources.iter().map(|m| m.description.as_deref()).collect();
    let site_name: Vec<Option<&str>> = sources.iter().map(|m| m.site_name.as_deref()).collect();

    PageMetadata {
        title: pick_first_text(&title),
        description: pick_first_text(&description),
        site_name: pick_first_text(&site_name).or_else(|| bare_hostname(url)),
    }
}

fn transcript_text(transcript: &TranscriptResolution) -> Option<String> {
    transcript
        .text
        .as_deref()
        .map(normalize_for_prompt)
        .filter(|t| !t.is_empty())
}

/// Base content followed by the transcript block
///
/// When the base already is the transcript only the marked block is kept.
fn assemble(base: &str, transcript: Option<&str>, rendered: Option<&str>) -> String {
    let (Some(transcript), Some(rendered)) = (transcript, rendered) else {
        return base.to_string();
    };
    if base.trim().is_empty() || base.trim() == transcript.trim() {
        format!("{}{}", TRANSCRIPT_MARKER, rendered)
    } else {
        format!("{}\n\n{}{}", base.trim_end(), TRANSCRIPT_MARKER, rendered)
    }
}

#[allow(clippy::too_many_arguments)]
fn finalize(
    url: &str,
    metadata: PageMetadata,
    base: String,
    transcript: TranscriptResolution,
    strategy: ContentStrategy,
    mut fetch: FetchDiagnostics,
    notes: Notes,
    options: &ContentOptions,
) -> ExtractedLinkContent {
    let text = transcript_text(&transcript);
    let segments = transcript
        .segments
        .as_deref()
        .or_else(|| {
            transcript
                .metadata
                .as_ref()
                .and_then(|m| m.segments.as_deref())
        })
        .filter(|s| !s.is_empty());

    let rendered = match (options.timestamps, segments) {
        (true, Some(segments)) => Some(render_timed(segments)),
        _ => text.clone(),
    };

    let content = assemble(&base, text.as_deref(), rendered.as_deref());
    let word_count = count_words(&content);
    let budgeted = apply_budget(&content, options.max_characters);

    let stats = rendered.as_deref().map(text_stats);
    let media_duration_seconds = transcript
        .metadata
        .as_ref()
        .and_then(|m| m.duration_seconds);
    fetch.notes = notes.joined();

    ExtractedLinkContent {
        url: url.to_string(),
        title: metadata.title,
        description: metadata.description,
        site_name: metadata.site_name,
        content: budgeted.content,
        truncated: budgeted.truncated,
        total_characters: budgeted.total_characters,
        word_count,
        transcript_characters: stats.map(|s| s.characters),
        transcript_lines: stats.map(|s| s.lines),
        transcript_word_count: stats.map(|s| s.words),
        transcript_segments: segments.map(<[_]>::len),
        transcript_source: text.as_ref().and(transcript.source.clone()),
        media_duration_seconds,
        diagnostics: ContentDiagnostics {
            strategy,
            fetch,
            transcript: transcript.diagnostics,
        },
    }
}
