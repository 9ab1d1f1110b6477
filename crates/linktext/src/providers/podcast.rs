//! Podcast transcript provider
//!
//! Uses transcripts published through the Podcasting 2.0
//! `<podcast:transcript>` feed tag. There is no speech-to-text here: an
//! episode without a published transcript is a miss.

use super::ProviderFetchOptions;
use crate::captions::{parse_cues, segments_to_text};
use crate::convert::{html_to_text, normalize_for_prompt};
use crate::error::LinkError;
use crate::resolver::normalize_url;
use crate::transport::RequestOptions;
use crate::types::{Notes, ProviderContext, ProviderResult, TranscriptMetadata, TranscriptSegment};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use url::Url;

const PODCAST_TRANSCRIPT: &str = "podcastTranscript";

const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".aac", ".ogg", ".opus", ".wav", ".flac"];

const PODCAST_HOSTS: &[&str] = &[
    "podcasts.apple.com",
    "overcast.fm",
    "pca.st",
    "pocketcasts.com",
    "castbox.fm",
    "podbean.com",
    "buzzsprout.com",
    "transistor.fm",
    "simplecast.com",
    "megaphone.fm",
    "anchor.fm",
    "podcasters.spotify.com",
];

static FEED_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link[^>]+type=["']application/(?:rss|atom)\+xml["'][^>]*>"#).unwrap()
});

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)href=["']([^"']+)["']"#).unwrap());

/// Returns true for audio files, feeds and known podcast hosts
pub fn is_podcast_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_lowercase();
    if AUDIO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return true;
    }
    if path.ends_with(".rss") || path.ends_with("/feed") || path.ends_with("/feed.xml") {
        return true;
    }

    let Some(host) = parsed.host_str().map(str::to_lowercase) else {
        return false;
    };
    if host == "open.spotify.com" {
        return path.starts_with("/episode/") || path.starts_with("/show/");
    }
    PODCAST_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
}

fn looks_like_feed(body: &str) -> bool {
    let head: String = body.chars().take(2048).collect::<String>().to_lowercase();
    head.contains("<rss") || head.contains("<feed")
}

pub(super) fn can_handle(context: &ProviderContext) -> bool {
    is_podcast_url(&context.url) || context.html.as_deref().is_some_and(looks_like_feed)
}

/// Transcript link published for an episode
#[derive(Debug, Clone, PartialEq, Eq)]
struct TranscriptLink {
    url: String,
    mime: String,
}

impl TranscriptLink {
    /// Lower is better
    fn rank(&self) -> u8 {
        match self.mime.as_str() {
            "text/vtt" => 0,
            "application/x-subrip" | "application/srt" => 1,
            "application/json" => 2,
            "text/plain" => 3,
            _ => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct FeedEpisode {
    title: Option<String>,
    link: Option<String>,
    enclosure_url: Option<String>,
    duration_seconds: Option<f64>,
    transcripts: Vec<TranscriptLink>,
}

impl FeedEpisode {
    fn matches(&self, url: &str) -> bool {
        let url = normalize_url(url);
        [self.link.as_deref(), self.enclosure_url.as_deref()]
            .into_iter()
            .flatten()
            .any(|candidate| normalize_url(candidate) == url)
    }

    fn assign(&mut self, element: &[u8], text: &str) {
        match element {
            b"title" => self.title = Some(text.to_string()),
            b"link" => self.link = Some(text.to_string()),
            b"itunes:duration" => self.duration_seconds = parse_duration(text),
            _ => {}
        }
    }
}

pub(super) async fn fetch_transcript(
    context: &ProviderContext,
    options: ProviderFetchOptions<'_>,
) -> ProviderResult {
    let attempted = vec![PODCAST_TRANSCRIPT.to_string()];
    let notes = Notes::new();

    let feed = match load_feed(context, options).await {
        Ok(Some(feed)) => feed,
        Ok(None) => {
            return ProviderResult::empty(attempted, notes.with("No podcast feed found"));
        }
        Err(e) => {
            return ProviderResult::empty(attempted, notes.with(format!("Feed fetch failed: {}", e)));
        }
    };

    let episodes = parse_feed(&feed.xml);
    if episodes.is_empty() {
        return ProviderResult::empty(attempted, notes.with("Feed has no episodes"));
    }
    // The newest episode stands in only when the link is the feed itself
    let matched = episodes.iter().find(|e| e.matches(&context.url));
    let Some(episode) = matched.or_else(|| episodes.first().filter(|_| feed.is_link)) else {
        return ProviderResult::empty(
            attempted,
            notes.with("No feed episode matches this URL"),
        );
    };

    let metadata = TranscriptMetadata {
        duration_seconds: episode.duration_seconds,
        title: episode.title.clone(),
        ..Default::default()
    };

    let mut links = episode.transcripts.clone();
    links.sort_by_key(TranscriptLink::rank);
    let Some(link) = links.first() else {
        return ProviderResult::empty(
            attempted,
            notes.with("Episode has no published transcript"),
        );
    };

    match fetch_transcript_file(link, options).await {
        Ok((text, segments)) if !text.is_empty() => ProviderResult {
            text: Some(text),
            source: Some(PODCAST_TRANSCRIPT.to_string()),
            metadata,
            segments: (!segments.is_empty()).then_some(segments),
            attempted_providers: attempted,
            notes: notes.joined(),
        },
        Ok(_) => ProviderResult::empty(attempted, notes.with("Published transcript is empty")),
        Err(e) => ProviderResult::empty(
            attempted,
            notes.with(format!("Transcript download failed: {}", e)),
        ),
    }
}

/// Feed document and whether it was loaded from the link itself
struct LoadedFeed {
    xml: String,
    is_link: bool,
}

/// Feed XML from the supplied markup, the URL itself, or an advertised feed link
async fn load_feed(
    context: &ProviderContext,
    options: ProviderFetchOptions<'_>,
) -> Result<Option<LoadedFeed>, LinkError> {
    if let Some(html) = context.html.as_deref() {
        if looks_like_feed(html) {
            return Ok(Some(LoadedFeed {
                xml: html.to_string(),
                is_link: true,
            }));
        }
    }

    let (feed_url, is_link) = match context.html.as_deref().and_then(advertised_feed) {
        Some(href) => {
            let url = Url::parse(&context.url)
                .and_then(|base| base.join(&href))
                .map(|u| u.to_string())
                .unwrap_or(href);
            let is_link = url == context.url;
            (url, is_link)
        }
        None => {
            let path = Url::parse(&context.url)
                .map(|u| u.path().to_lowercase())
                .unwrap_or_default();
            if !(path.ends_with(".rss") || path.ends_with("feed") || path.ends_with(".xml")) {
                return Ok(None);
            }
            (context.url.clone(), true)
        }
    };

    let response = options
        .transport
        .fetch(&feed_url, &RequestOptions::get())
        .await?;
    if !response.is_success() {
        return Err(LinkError::HttpStatus {
            status: response.status,
            url: feed_url,
        });
    }
    let body = response.text();
    Ok(looks_like_feed(&body).then_some(LoadedFeed { xml: body, is_link }))
}

fn advertised_feed(html: &str) -> Option<String> {
    let tag = FEED_LINK.find(html)?;
    HREF.captures(tag.as_str())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
}

/// Parse `hh:mm:ss`, `mm:ss` or plain seconds
fn parse_duration(raw: &str) -> Option<f64> {
    let parts: Vec<f64> = raw
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [s] => Some(*s),
        [m, s] => Some(m * 60.0 + s),
        [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
        _ => None,
    }
}

fn parse_feed(xml: &str) -> Vec<FeedEpisode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut episodes = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<FeedEpisode> = None;
    let mut element: Option<Vec<u8>> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name().as_ref().to_vec();
                let is_empty = matches!(event, Ok(Event::Empty(_)));
                match name.as_slice() {
                    b"item" | b"entry" => current = Some(FeedEpisode::default()),
                    b"enclosure" => {
                        if let Some(episode) = current.as_mut() {
                            episode.enclosure_url = attribute(e, b"url");
                        }
                    }
                    b"podcast:transcript" => {
                        if let (Some(episode), Some(url)) = (current.as_mut(), attribute(e, b"url"))
                        {
                            let mime = attribute(e, b"type").unwrap_or_default().to_lowercase();
                            episode.transcripts.push(TranscriptLink { url, mime });
                        }
                    }
                    _ if !is_empty => element = Some(e.name().as_ref().to_vec()),
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(episode), Some(name), Ok(text)) =
                    (current.as_mut(), element.as_deref(), e.unescape())
                {
                    episode.assign(name, text.trim());
                }
            }
            Ok(Event::CData(ref e)) => {
                if let (Some(episode), Some(name)) = (current.as_mut(), element.as_deref()) {
                    episode.assign(name, String::from_utf8_lossy(e).trim());
                }
            }
            Ok(Event::End(ref e)) => {
                if matches!(e.name().as_ref(), b"item" | b"entry") {
                    if let Some(episode) = current.take() {
                        episodes.push(episode);
                    }
                }
                element = None;
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    episodes
}

/// Podcasting 2.0 JSON transcript
#[derive(Debug, Deserialize)]
struct JsonTranscript {
    #[serde(default)]
    segments: Vec<JsonSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonSegment {
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    end_time: f64,
    #[serde(default)]
    body: String,
}

fn parse_json_transcript(body: &str) -> Vec<TranscriptSegment> {
    serde_json::from_str::<JsonTranscript>(body)
        .map(|t| {
            t.segments
                .into_iter()
                .filter(|s| !s.body.trim().is_empty())
                .map(|s| {
                    TranscriptSegment::new(
                        (s.start_time * 1000.0).round() as u64,
                        (s.end_time * 1000.0).round() as u64,
                        s.body.trim(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn fetch_transcript_file(
    link: &TranscriptLink,
    options: ProviderFetchOptions<'_>,
) -> Result<(String, Vec<TranscriptSegment>), LinkError> {
    let response = options
        .transport
        .fetch(&link.url, &RequestOptions::get())
        .await?;
    if !response.is_success() {
        return Err(LinkError::HttpStatus {
            status: response.status,
            url: link.url.clone(),
        });
    }
    let body = response.text();

    let segments = match link.mime.as_str() {
        "text/vtt" | "application/x-subrip" | "application/srt" => parse_cues(&body),
        "application/json" => parse_json_transcript(&body),
        _ => Vec::new(),
    };
    if !segments.is_empty() {
        return Ok((segments_to_text(&segments), segments));
    }

    let text = if link.mime == "text/html" {
        html_to_text(&body)
    } else {
        normalize_for_prompt(&body)
    };
    Ok((text, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd" xmlns:podcast="https://podcastindex.org/namespace/1.0">
  <channel>
    <title>Show</title>
    <item>
      <title>Episode 2</title>
      <link>https://show.example.com/ep2</link>
      <enclosure url="https://cdn.example.com/ep2.mp3" type="audio/mpeg" length="1"/>
      <itunes:duration>1:02:03</itunes:duration>
      <podcast:transcript url="https://cdn.example.com/ep2.txt" type="text/plain"/>
      <podcast:transcript url="https://cdn.example.com/ep2.vtt" type="text/vtt"/>
    </item>
    <item>
      <title><![CDATA[Episode 1]]></title>
      <link>https://show.example.com/ep1</link>
      <itunes:duration>300</itunes:duration>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_is_podcast_url() {
        assert!(is_podcast_url("https://cdn.example.com/show/ep-1.mp3"));
        assert!(is_podcast_url("https://podcasts.apple.com/us/podcast/x/id1"));
        assert!(is_podcast_url("https://open.spotify.com/episode/abc"));
        assert!(is_podcast_url("https://feeds.example.com/show.rss"));
        assert!(is_podcast_url("https://myshow.buzzsprout.com/123"));
        assert!(!is_podcast_url("https://open.spotify.com/track/abc"));
        assert!(!is_podcast_url("https://example.com/blog"));
    }

    #[test]
    fn test_can_handle_feed_markup() {
        let ctx = ProviderContext {
            url: "https://example.com/whatever".to_string(),
            html: Some(FEED.to_string()),
            resource_key: None,
        };
        assert!(can_handle(&ctx));
    }

    #[test]
    fn test_parse_feed() {
        let episodes = parse_feed(FEED);
        assert_eq!(episodes.len(), 2);
        let ep2 = &episodes[0];
        assert_eq!(ep2.title.as_deref(), Some("Episode 2"));
        assert_eq!(ep2.link.as_deref(), Some("https://show.example.com/ep2"));
        assert_eq!(
            ep2.enclosure_url.as_deref(),
            Some("https://cdn.example.com/ep2.mp3")
        );
        assert_eq!(ep2.duration_seconds, Some(3723.0));
        assert_eq!(ep2.transcripts.len(), 2);
        assert_eq!(episodes[1].title.as_deref(), Some("Episode 1"));
        assert_eq!(episodes[1].duration_seconds, Some(300.0));
        assert!(episodes[1].transcripts.is_empty());
    }

    #[test]
    fn test_transcript_rank_prefers_vtt() {
        let mut links = parse_feed(FEED)[0].transcripts.clone();
        links.sort_by_key(TranscriptLink::rank);
        assert_eq!(links[0].mime, "text/vtt");
    }

    #[test]
    fn test_episode_matching() {
        let episodes = parse_feed(FEED);
        assert!(episodes[0].matches("https://cdn.example.com/ep2.mp3"));
        assert!(!episodes[1].matches("https://cdn.example.com/ep2.mp3"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90"), Some(90.0));
        assert_eq!(parse_duration("01:30"), Some(90.0));
        assert_eq!(parse_duration("1:00:00"), Some(3600.0));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_advertised_feed() {
        let html = r#"<head><link rel="alternate" type="application/rss+xml" title="Feed" href="/feed.xml?a=1&amp;b=2"></head>"#;
        assert_eq!(advertised_feed(html), Some("/feed.xml?a=1&b=2".to_string()));
        assert_eq!(advertised_feed("<head></head>"), None);
    }

    #[test]
    fn test_parse_json_transcript() {
        let body = r#"{"version":"1.0.0","segments":[{"startTime":0.5,"endTime":2,"body":"Hi"},{"startTime":2,"endTime":3,"body":" "}]}"#;
        let segments = parse_json_transcript(body);
        assert_eq!(segments, vec![TranscriptSegment::new(500, 2000, "Hi")]);
    }
}
