//! Transcript cache
//!
//! Stores are keyed by URL and only need last-writer-wins semantics.
//! [`TranscriptCache`] layers the read/write policy on top of a store:
//! staleness, bypass, timestamp capability and the fallback candidate.

use crate::error::LinkError;
use crate::types::{
    CacheMode, CacheStatus, CachedTranscriptEntry, Notes, ProviderResult, TranscriptDiagnostics,
    TranscriptMetadata, TranscriptResolution, TranscriptSegment,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Persistent transcript store
#[async_trait]
pub trait TranscriptCacheStore: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<CachedTranscriptEntry>, LinkError>;
    async fn set(&self, url: &str, entry: CachedTranscriptEntry) -> Result<(), LinkError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryTranscriptCache {
    entries: RwLock<HashMap<String, CachedTranscriptEntry>>,
}

impl MemoryTranscriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TranscriptCacheStore for MemoryTranscriptCache {
    async fn get(&self, url: &str) -> Result<Option<CachedTranscriptEntry>, LinkError> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn set(&self, url: &str, entry: CachedTranscriptEntry) -> Result<(), LinkError> {
        self.entries.write().await.insert(url.to_string(), entry);
        Ok(())
    }
}

/// One JSON file per URL under a directory
///
/// File names are the first 16 bytes of the URL's SHA-256 in hex. Writes go
/// through a temp file and a rename so readers never see partial JSON.
#[derive(Debug, Clone)]
pub struct FileTranscriptCache {
    root: PathBuf,
}

impl FileTranscriptCache {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let name = digest.iter().take(16).fold(String::new(), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        });
        self.root.join(format!("tr_{name}.json"))
    }
}

#[async_trait]
impl TranscriptCacheStore for FileTranscriptCache {
    async fn get(&self, url: &str) -> Result<Option<CachedTranscriptEntry>, LinkError> {
        let path = self.entry_path(url);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt transcript cache entry");
                Ok(None)
            }
        }
    }

    async fn set(&self, url: &str, entry: CachedTranscriptEntry) -> Result<(), LinkError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.entry_path(url);
        let json =
            serde_json::to_vec_pretty(&entry).map_err(|e| LinkError::Cache(e.to_string()))?;
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "Wrote transcript cache entry");
        Ok(())
    }
}

/// Cache read policy
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    /// Entries older than this are misses, but still usable as a fallback
    pub max_age: Option<Duration>,
}

/// Diagnostics fields decided by the cache lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticsSeed {
    pub cache_mode: CacheMode,
    pub cache_status: CacheStatus,
    pub notes: Notes,
}

/// Outcome of a cache read
#[derive(Debug, Clone, Default)]
pub struct CacheRead {
    /// Short-circuit result for a valid hit
    pub resolution: Option<TranscriptResolution>,
    /// Entry available for stale fallback
    pub cached: Option<CachedTranscriptEntry>,
    pub seed: DiagnosticsSeed,
}

/// Store plus read/write policy
#[derive(Clone)]
pub struct TranscriptCache {
    store: Arc<dyn TranscriptCacheStore>,
    policy: CachePolicy,
}

impl TranscriptCache {
    pub fn new(store: Arc<dyn TranscriptCacheStore>) -> Self {
        Self {
            store,
            policy: CachePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Look up a transcript before provider dispatch
    ///
    /// An entry fetched before `file_mtime` is ignored entirely. Bypass mode
    /// never short-circuits but still hands back the entry.
    pub async fn read(
        &self,
        url: &str,
        cache_mode: CacheMode,
        wants_timestamps: bool,
        file_mtime: Option<DateTime<Utc>>,
    ) -> CacheRead {
        let mut notes = Notes::new();

        let entry = match self.store.get(url).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(url = %url, error = %e, "Transcript cache read failed");
                notes.push(format!("Cache read failed: {}", e));
                None
            }
        };

        let entry = match entry {
            Some(entry) if file_mtime.is_some_and(|mtime| entry.fetched_at < mtime) => {
                notes.push("Cached transcript predates file modification");
                None
            }
            other => other,
        };

        let seed = |cache_status, notes| DiagnosticsSeed {
            cache_mode,
            cache_status,
            notes,
        };

        if cache_mode == CacheMode::Bypass {
            return CacheRead {
                resolution: None,
                cached: entry,
                seed: seed(CacheStatus::Bypassed, notes.with("Cache bypass requested")),
            };
        }

        let Some(entry) = entry else {
            return CacheRead {
                resolution: None,
                cached: None,
                seed: seed(CacheStatus::Miss, notes),
            };
        };

        let expired = self
            .policy
            .max_age
            .is_some_and(|max_age| Utc::now() - entry.fetched_at > max_age);
        if expired {
            notes.push("Cached transcript expired");
        } else if wants_timestamps && !entry.has_segments() {
            notes.push("Cached transcript lacks timestamps");
        }
        if expired || (wants_timestamps && !entry.has_segments()) {
            return CacheRead {
                resolution: None,
                cached: Some(entry),
                seed: seed(CacheStatus::Miss, notes),
            };
        }

        debug!(url = %url, source = ?entry.source, "Transcript cache hit");
        let resolution = TranscriptResolution {
            text: entry.content.clone(),
            source: entry.source.clone(),
            metadata: Some(entry.metadata.clone()),
            segments: if wants_timestamps {
                entry.metadata.segments.clone()
            } else {
                None
            },
            diagnostics: TranscriptDiagnostics {
                cache_mode,
                cache_status: CacheStatus::Hit,
                text_provided: entry.content.is_some(),
                provider: entry.source.clone(),
                attempted_providers: Vec::new(),
                notes: notes.joined(),
            },
        };

        CacheRead {
            resolution: Some(resolution),
            cached: Some(entry),
            seed: seed(CacheStatus::Hit, notes),
        }
    }

    /// Persist a provider result when it carries a source or text
    ///
    /// Write failures are logged and otherwise ignored.
    pub async fn write(
        &self,
        url: &str,
        service: &str,
        resource_key: Option<&str>,
        result: &ProviderResult,
        wants_timestamps: bool,
        file_mtime: Option<DateTime<Utc>>,
    ) {
        if !result.is_cacheable() {
            return;
        }

        let now = Utc::now();
        let entry = CachedTranscriptEntry {
            content: result.text.clone(),
            source: result.source.clone(),
            service: service.to_string(),
            resource_key: resource_key.map(str::to_string),
            metadata: fold_segments(
                result.metadata.clone(),
                result.segments.as_deref(),
                wants_timestamps,
            ),
            fetched_at: file_mtime.map_or(now, |mtime| mtime.max(now)),
        };

        if let Err(e) = self.store.set(url, entry).await {
            warn!(url = %url, error = %e, "Transcript cache write failed");
        }
    }
}

/// Fold provider segments into metadata
///
/// With timestamps requested the `timestamps` flag records whether segments
/// were available; otherwise segments are carried without the flag.
pub fn fold_segments(
    mut metadata: TranscriptMetadata,
    segments: Option<&[TranscriptSegment]>,
    wants_timestamps: bool,
) -> TranscriptMetadata {
    let segments = segments.filter(|s| !s.is_empty());
    if wants_timestamps {
        metadata.timestamps = Some(segments.is_some());
        if let Some(segments) = segments {
            metadata.segments = Some(segments.to_vec());
        }
    } else if let Some(segments) = segments {
        metadata.segments = Some(segments.to_vec());
    }
    metadata
}
