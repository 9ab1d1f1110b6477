//! Core types for LinkText

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// HTTP method used by the transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Policy for honoring a cached transcript on read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Use a valid cached entry instead of dispatching a provider
    #[default]
    Default,
    /// Ignore cached entries on read; results are still written back
    Bypass,
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(CacheMode::Default),
            "bypass" => Ok(CacheMode::Bypass),
            _ => Err("Invalid cache mode: must be default or bypass".to_string()),
        }
    }
}

impl std::fmt::Display for CacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheMode::Default => write!(f, "default"),
            CacheMode::Bypass => write!(f, "bypass"),
        }
    }
}

/// Outcome of the transcript cache lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypassed,
    Fallback,
    /// No cache store configured
    #[default]
    Unknown,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypassed => "bypassed",
            CacheStatus::Fallback => "fallback",
            CacheStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Timed transcript fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

/// Typed transcript metadata
///
/// Only the handful of keys consumed downstream are carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<TranscriptSegment>>,

    /// True when timestamps were requested and segments were available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Caption language code, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Resolved identity of the requested resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub normalized_url: String,
    /// Embedded video URL when one was found in the page, else the normalized URL
    pub effective_url: String,
    /// Video id for recognized video URLs
    pub resource_key: Option<String>,
}

/// Input handed to provider selection and fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    pub url: String,
    pub html: Option<String>,
    pub resource_key: Option<String>,
}

/// Result of a single provider fetch
///
/// Providers never fail: a miss is an empty result with `notes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResult {
    pub text: Option<String>,
    /// Sub-strategy that produced the text
    pub source: Option<String>,
    pub metadata: TranscriptMetadata,
    pub segments: Option<Vec<TranscriptSegment>>,
    /// Sub-strategy names in the order they were tried
    pub attempted_providers: Vec<String>,
    pub notes: Option<String>,
}

impl ProviderResult {
    /// Empty result carrying the attempted sub-strategies and a note
    pub fn empty(attempted_providers: Vec<String>, notes: Notes) -> Self {
        Self {
            attempted_providers,
            notes: notes.joined(),
            ..Default::default()
        }
    }

    /// True when the result is worth persisting to the cache
    pub fn is_cacheable(&self) -> bool {
        self.source.is_some() || self.text.is_some()
    }
}

/// Persisted transcript result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTranscriptEntry {
    pub content: Option<String>,
    pub source: Option<String>,
    pub service: String,
    #[serde(default)]
    pub resource_key: Option<String>,
    #[serde(default)]
    pub metadata: TranscriptMetadata,
    pub fetched_at: DateTime<Utc>,
}

impl CachedTranscriptEntry {
    pub fn has_segments(&self) -> bool {
        self.metadata
            .segments
            .as_ref()
            .is_some_and(|segments| !segments.is_empty())
    }
}

/// Append-only diagnostics notes, rendered joined with `"; "`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notes(Vec<String>);

impl Notes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a previously joined notes string back into notes
    pub fn from_joined(joined: Option<&str>) -> Self {
        let mut notes = Self::new();
        if let Some(joined) = joined {
            for note in joined.split("; ") {
                notes.push(note);
            }
        }
        notes
    }

    pub fn push(&mut self, note: impl Into<String>) {
        let note = note.into();
        let note = note.trim();
        if !note.is_empty() {
            self.0.push(note.to_string());
        }
    }

    /// Builder form of [`Notes::push`]
    pub fn with(mut self, note: impl Into<String>) -> Self {
        self.push(note);
        self
    }

    /// Append another accumulator after this one
    pub fn merge(mut self, other: Notes) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn joined(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join("; "))
        }
    }
}

/// How the transcript for a link was obtained
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptDiagnostics {
    pub cache_mode: CacheMode,
    pub cache_status: CacheStatus,
    pub text_provided: bool,
    pub provider: Option<String>,
    pub attempted_providers: Vec<String>,
    pub notes: Option<String>,
}

/// Final output of transcript resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResolution {
    pub text: Option<String>,
    pub source: Option<String>,
    pub metadata: Option<TranscriptMetadata>,
    pub segments: Option<Vec<TranscriptSegment>>,
    pub diagnostics: TranscriptDiagnostics,
}

/// Strategy that produced the extracted content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentStrategy {
    Firecrawl,
    #[default]
    Html,
}

/// Diagnostics of the fetch stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchDiagnostics {
    /// Enhanced fetch service was called
    pub enhanced_attempted: bool,
    /// Enhanced fetch service output was used
    pub enhanced_used: bool,
    /// Status of the direct HTML fetch, when performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentDiagnostics {
    pub strategy: ContentStrategy,
    pub fetch: FetchDiagnostics,
    pub transcript: TranscriptDiagnostics,
}

/// Normalized, budgeted content for a link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLinkContent {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub content: String,
    /// True iff content exceeded the character budget
    pub truncated: bool,
    /// Character count before truncation
    pub total_characters: usize,
    pub word_count: usize,
    pub transcript_characters: Option<usize>,
    pub transcript_lines: Option<usize>,
    pub transcript_word_count: Option<usize>,
    pub transcript_segments: Option<usize>,
    pub transcript_source: Option<String>,
    pub media_duration_seconds: Option<f64>,
    pub diagnostics: ContentDiagnostics,
}
