//! Caption formats and timed transcript rendering

use crate::types::TranscriptSegment;
use once_cell::sync::Lazy;
use regex::Regex;

static CUE_TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*((?:\d+:)?\d{1,2}:\d{2}[.,]\d{1,3})\s*-->\s*((?:\d+:)?\d{1,2}:\d{2}[.,]\d{1,3})",
    )
    .unwrap()
});

static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Parse `hh:mm:ss.mmm`, `mm:ss.mmm` or the SRT `,` variant into milliseconds
fn parse_cue_time(raw: &str) -> Option<u64> {
    let raw = raw.replace(',', ".");
    let (clock, millis) = raw.split_once('.')?;
    let millis: u64 = format!("{:0<3}", millis).get(..3)?.parse().ok()?;

    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let seconds = match parts.as_slice() {
        [m, s] => m * 60 + s,
        [h, m, s] => h * 3600 + m * 60 + s,
        _ => return None,
    };
    Some(seconds * 1000 + millis)
}

/// Parse WebVTT or SRT cues into segments
///
/// Both formats share the `start --> end` timing line; cue identifiers,
/// headers and NOTE blocks are skipped.
pub fn parse_cues(body: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut current: Option<(u64, u64, Vec<String>)> = None;

    for line in body.lines() {
        if let Some(caps) = CUE_TIMING.captures(line) {
            if let Some(segment) = current.take().and_then(finish_cue) {
                segments.push(segment);
            }
            let start = caps.get(1).and_then(|m| parse_cue_time(m.as_str()));
            let end = caps.get(2).and_then(|m| parse_cue_time(m.as_str()));
            if let (Some(start), Some(end)) = (start, end) {
                current = Some((start, end, Vec::new()));
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if let Some(segment) = current.take().and_then(finish_cue) {
                segments.push(segment);
            }
            continue;
        }

        if let Some((_, _, lines)) = current.as_mut() {
            lines.push(trimmed.to_string());
        }
    }

    if let Some(segment) = current.take().and_then(finish_cue) {
        segments.push(segment);
    }

    dedupe_rolling(segments)
}

fn finish_cue((start, end, lines): (u64, u64, Vec<String>)) -> Option<TranscriptSegment> {
    let text = INLINE_TAG.replace_all(&lines.join(" "), "").trim().to_string();
    (!text.is_empty()).then(|| TranscriptSegment::new(start, end, text))
}

/// Auto-generated captions repeat the previous cue; drop exact repeats
fn dedupe_rolling(segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    let mut out: Vec<TranscriptSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if out.last().is_some_and(|prev| prev.text == segment.text) {
            continue;
        }
        out.push(segment);
    }
    out
}

/// Format milliseconds as `m:ss`, or `h:mm:ss` past one hour
pub fn format_timestamp(ms: u64) -> String {
    let total = ms / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Render segments as `[m:ss] text` lines
pub fn render_timed(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}] {}", format_timestamp(s.start_ms), s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join segment text into a plain transcript
pub fn segments_to_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
