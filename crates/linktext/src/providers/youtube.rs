//! YouTube caption provider
//!
//! Reads caption tracks from the `ytInitialPlayerResponse` embedded in a
//! watch page and downloads the chosen track as timed text.

use super::{ProviderFetchOptions, YoutubeTranscriptMode};
use crate::captions::segments_to_text;
use crate::error::LinkError;
use crate::metadata::extract_player_response;
use crate::resolver::{extract_youtube_video_id, is_youtube_video_url, youtube_watch_url};
use crate::transport::RequestOptions;
use crate::types::{Notes, ProviderContext, ProviderResult, TranscriptMetadata, TranscriptSegment};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const CAPTION_TRACKS: &str = "captionTracks";
const WATCH_PAGE: &str = "watchPage";

/// Caption track entry of the player configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    /// "asr" for auto-generated tracks
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn is_english(&self) -> bool {
        self.language_code.to_lowercase().starts_with("en")
    }
}

/// Timed text in `json3` format
#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

pub(super) fn can_handle(context: &ProviderContext) -> bool {
    context.resource_key.is_some() || is_youtube_video_url(&context.url)
}

pub(super) async fn fetch_transcript(
    context: &ProviderContext,
    options: ProviderFetchOptions<'_>,
) -> ProviderResult {
    let video_id = context
        .resource_key
        .clone()
        .or_else(|| extract_youtube_video_id(&context.url));
    let Some(video_id) = video_id else {
        return ProviderResult::empty(
            Vec::new(),
            Notes::new().with("YouTube URL has no video id"),
        );
    };

    let mut attempted = Vec::new();
    let mut notes = Notes::new();

    if options.youtube_mode != YoutubeTranscriptMode::Web {
        let player = context
            .html
            .as_deref()
            .and_then(extract_player_response)
            .filter(|player| player_matches(player, &video_id));
        if let Some(player) = player {
            attempted.push(CAPTION_TRACKS.to_string());
            match transcript_from_player(&player, options).await {
                Ok(Some(result)) => return result.finish(CAPTION_TRACKS, attempted, notes),
                Ok(None) => notes.push("Page has no caption tracks"),
                Err(e) => notes.push(format!("Caption track fetch failed: {}", e)),
            }
        }
    }

    if options.youtube_mode != YoutubeTranscriptMode::Embedded {
        attempted.push(WATCH_PAGE.to_string());
        match fetch_watch_page(&video_id, options).await {
            Ok(player) => match transcript_from_player(&player, options).await {
                Ok(Some(result)) => return result.finish(WATCH_PAGE, attempted, notes),
                Ok(None) => notes.push("Watch page has no caption tracks"),
                Err(e) => notes.push(format!("Caption track fetch failed: {}", e)),
            },
            Err(e) => notes.push(format!("Watch page fetch failed: {}", e)),
        }
    }

    if attempted.is_empty() {
        notes.push("No YouTube player data available");
    }
    debug!(video_id = %video_id, attempted = ?attempted, "YouTube transcript unavailable");
    ProviderResult::empty(attempted, notes)
}

/// Captions fetched through one sub-strategy
struct CaptionFetch {
    segments: Vec<TranscriptSegment>,
    metadata: TranscriptMetadata,
}

impl CaptionFetch {
    fn finish(self, source: &str, attempted: Vec<String>, notes: Notes) -> ProviderResult {
        ProviderResult {
            text: Some(segments_to_text(&self.segments)),
            source: Some(source.to_string()),
            metadata: self.metadata,
            segments: Some(self.segments),
            attempted_providers: attempted,
            notes: notes.joined(),
        }
    }
}

fn player_matches(player: &Value, video_id: &str) -> bool {
    match player
        .pointer("/videoDetails/videoId")
        .and_then(Value::as_str)
    {
        Some(id) => id == video_id,
        None => true,
    }
}

async fn fetch_watch_page(
    video_id: &str,
    options: ProviderFetchOptions<'_>,
) -> Result<Value, LinkError> {
    let url = youtube_watch_url(video_id);
    let mut request = RequestOptions::get().header("accept-language", "en-US,en;q=0.9");
    if let Some(cookie) = options.credentials.get("youtube_cookie") {
        request = request.header("cookie", cookie);
    }

    let response = options.transport.fetch(&url, &request).await?;
    if !response.is_success() {
        return Err(LinkError::HttpStatus {
            status: response.status,
            url,
        });
    }
    extract_player_response(&response.text())
        .ok_or_else(|| LinkError::RequestError("watch page has no player response".to_string()))
}

/// Prefer manual English, then any English, then any manual track, then the first
fn choose_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.is_english() && !t.is_generated())
        .or_else(|| tracks.iter().find(|t| t.is_english()))
        .or_else(|| tracks.iter().find(|t| !t.is_generated()))
        .or_else(|| tracks.first())
}

async fn transcript_from_player(
    player: &Value,
    options: ProviderFetchOptions<'_>,
) -> Result<Option<CaptionFetch>, LinkError> {
    let tracks: Vec<CaptionTrack> = player
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let Some(track) = choose_track(&tracks) else {
        return Ok(None);
    };

    let url = timed_text_url(&track.base_url);
    let response = options.transport.fetch(&url, &RequestOptions::get()).await?;
    if !response.is_success() {
        return Err(LinkError::HttpStatus {
            status: response.status,
            url,
        });
    }

    let segments = parse_timed_text(&response.text());
    if segments.is_empty() {
        return Ok(None);
    }

    let metadata = TranscriptMetadata {
        duration_seconds: player
            .pointer("/videoDetails/lengthSeconds")
            .and_then(|v| v.as_str().and_then(|s| s.parse().ok()).or_else(|| v.as_f64())),
        title: player
            .pointer("/videoDetails/title")
            .and_then(Value::as_str)
            .map(str::to_string),
        language: (!track.language_code.is_empty()).then(|| track.language_code.clone()),
        ..Default::default()
    };

    Ok(Some(CaptionFetch { segments, metadata }))
}

fn timed_text_url(base_url: &str) -> String {
    let base = if base_url.starts_with('/') {
        format!("https://www.youtube.com{}", base_url)
    } else {
        base_url.to_string()
    };
    if base.contains("fmt=") {
        base
    } else if base.contains('?') {
        format!("{}&fmt=json3", base)
    } else {
        format!("{}?fmt=json3", base)
    }
}

/// Parse `json3` timed text, falling back to the legacy XML format
fn parse_timed_text(body: &str) -> Vec<TranscriptSegment> {
    if let Ok(timed) = serde_json::from_str::<TimedText>(body) {
        return timed
            .events
            .into_iter()
            .filter_map(|event| {
                let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                (!text.is_empty()).then(|| {
                    TranscriptSegment::new(
                        event.t_start_ms,
                        event.t_start_ms + event.d_duration_ms,
                        text,
                    )
                })
            })
            .collect();
    }
    parse_timed_text_xml(body)
}

fn parse_timed_text_xml(body: &str) -> Vec<TranscriptSegment> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut segments = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"text" => {
                let mut start = 0.0_f64;
                let mut duration = 0.0_f64;
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .ok()
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(0.0);
                    match attr.key.as_ref() {
                        b"start" => start = value,
                        b"dur" => duration = value,
                        _ => {}
                    }
                }
                let start_ms = (start * 1000.0).round() as u64;
                current = Some((start_ms, start_ms + (duration * 1000.0).round() as u64));
                text.clear();
            }
            Ok(Event::Text(e)) if current.is_some() => {
                if let Ok(t) = e.unescape() {
                    text.push_str(&t);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"text" => {
                if let Some((start, end)) = current.take() {
                    // Caption text is HTML-escaped a second time inside the XML
                    let cleaned = crate::convert::html_to_text(&text);
                    if !cleaned.is_empty() {
                        segments.push(TranscriptSegment::new(start, end, cleaned));
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    segments
}
