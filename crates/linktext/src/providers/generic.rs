//! Generic transcript provider
//!
//! Picks up caption files attached to `<video>`/`<audio>` elements through
//! `<track kind="captions|subtitles">`.

use super::ProviderFetchOptions;
use crate::captions::{parse_cues, segments_to_text};
use crate::error::LinkError;
use crate::transport::RequestOptions;
use crate::types::{Notes, ProviderContext, ProviderResult, TranscriptMetadata, TranscriptSegment};
use scraper::{Html, Selector};
use url::Url;

const EMBEDDED_TRACK: &str = "embeddedTrack";

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackRef {
    src: String,
    language: Option<String>,
    label: Option<String>,
}

/// Caption tracks in document order, English first
fn find_tracks(html: &str, base: &str) -> Vec<TrackRef> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("track[src]") else {
        return Vec::new();
    };
    let base = Url::parse(base).ok();

    let mut tracks: Vec<TrackRef> = document
        .select(&selector)
        .filter(|el| {
            let kind = el.value().attr("kind").unwrap_or("subtitles");
            kind.eq_ignore_ascii_case("captions") || kind.eq_ignore_ascii_case("subtitles")
        })
        .filter_map(|el| {
            let raw = el.value().attr("src")?.trim();
            if raw.is_empty() {
                return None;
            }
            let src = match &base {
                Some(base) => base.join(raw).ok()?.to_string(),
                None => Url::parse(raw).ok()?.to_string(),
            };
            Some(TrackRef {
                src,
                language: el.value().attr("srclang").map(str::to_string),
                label: el.value().attr("label").map(str::to_string),
            })
        })
        .collect();

    tracks.sort_by_key(|t| {
        !t.language
            .as_deref()
            .is_some_and(|lang| lang.to_lowercase().starts_with("en"))
    });
    tracks
}

pub(super) async fn fetch_transcript(
    context: &ProviderContext,
    options: ProviderFetchOptions<'_>,
) -> ProviderResult {
    let attempted = vec![EMBEDDED_TRACK.to_string()];
    let mut notes = Notes::new();

    let Some(html) = context.html.as_deref() else {
        return ProviderResult::empty(attempted, notes.with("No page markup to inspect"));
    };

    let tracks = find_tracks(html, &context.url);
    if tracks.is_empty() {
        return ProviderResult::empty(attempted, notes.with("No caption track found on page"));
    }

    for track in &tracks {
        match fetch_track(&track.src, options).await {
            Ok(segments) if !segments.is_empty() => {
                let metadata = TranscriptMetadata {
                    language: track.language.clone(),
                    title: track.label.clone(),
                    ..Default::default()
                };
                return ProviderResult {
                    text: Some(segments_to_text(&segments)),
                    source: Some(EMBEDDED_TRACK.to_string()),
                    metadata,
                    segments: Some(segments),
                    attempted_providers: attempted,
                    notes: notes.joined(),
                };
            }
            Ok(_) => notes.push(format!("Caption track {} has no cues", track.src)),
            Err(e) => notes.push(format!("Caption track {} failed: {}", track.src, e)),
        }
    }

    ProviderResult::empty(attempted, notes)
}

async fn fetch_track(
    src: &str,
    options: ProviderFetchOptions<'_>,
) -> Result<Vec<TranscriptSegment>, LinkError> {
    let response = options.transport.fetch(src, &RequestOptions::get()).await?;
    if !response.is_success() {
        return Err(LinkError::HttpStatus {
            status: response.status,
            url: src.to_string(),
        });
    }
    Ok(parse_cues(&response.text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tracks_resolves_relative_src() {
        let html = r#"<video src="/v.mp4">
            <track kind="chapters" src="/chapters.vtt">
            <track kind="subtitles" srclang="de" src="/de.vtt">
            <track kind="captions" srclang="en" label="English" src="captions/en.vtt">
        </video>"#;
        let tracks = find_tracks(html, "https://example.com/talks/page.html");
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].src, "https://example.com/talks/captions/en.vtt");
        assert_eq!(tracks[0].label.as_deref(), Some("English"));
        assert_eq!(tracks[1].src, "https://example.com/de.vtt");
    }

    #[test]
    fn test_find_tracks_none() {
        assert!(find_tracks("<p>No media</p>", "https://example.com").is_empty());
        assert!(find_tracks("<track kind='captions' src=''>", "https://example.com").is_empty());
    }
}
