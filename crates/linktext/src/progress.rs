//! Transcript progress events
//!
//! Progress is fire-and-forget: a missing sink is a no-op and a panicking
//! sink is caught and logged so it can never abort resolution.

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressKind {
    TranscriptStart,
    TranscriptDone,
}

/// Progress update emitted around provider dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub url: String,
    /// Provider name, e.g. "youtube"
    pub service: String,
    /// Human readable status line
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// Sub-strategy that produced the transcript
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ProgressEvent {
    pub fn start(url: impl Into<String>, service: &str, hint: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::TranscriptStart,
            url: url.into(),
            service: service.to_string(),
            hint: hint.into(),
            ok: None,
            source: None,
        }
    }

    pub fn done(
        url: impl Into<String>,
        service: &str,
        hint: impl Into<String>,
        ok: bool,
        source: Option<String>,
    ) -> Self {
        Self {
            kind: ProgressKind::TranscriptDone,
            url: url.into(),
            service: service.to_string(),
            hint: hint.into(),
            ok: Some(ok),
            source,
        }
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Deliver an event to an optional sink, swallowing panics
pub fn emit(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    let Some(sink) = sink else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(|| sink.on_progress(&event))).is_err() {
        warn!(kind = ?event.kind, url = %event.url, "Progress sink panicked; event dropped");
    }
}
