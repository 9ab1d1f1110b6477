//! URL normalization and resource key derivation

use crate::types::ResourceReference;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Elements that place a player on the page; plain links are not embeds
const EMBED_POINTS: &str = r#"iframe[src], embed[src], object[data], meta[property="og:video"], meta[property="og:video:url"], meta[property="og:video:secure_url"]"#;

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
    "www.youtube-nocookie.com",
    "youtube-nocookie.com",
];

/// Normalize a user supplied URL
///
/// Trims whitespace and drops the fragment. Unparseable input is returned
/// trimmed so that callers can still key caches on it.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Extract the 11 character video id from a YouTube URL
pub fn extract_youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let candidate = if host == "youtu.be" {
        parsed.path_segments()?.next().map(str::to_string)
    } else {
        let segments: Vec<&str> = parsed.path_segments().map(|s| s.collect()).unwrap_or_default();
        match segments.as_slice() {
            ["watch", ..] => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string()),
            ["embed" | "shorts" | "live" | "v", id, ..] => Some(id.to_string()),
            _ => None,
        }
    }?;

    VIDEO_ID.is_match(&candidate).then_some(candidate)
}

/// Returns true for YouTube URLs that identify a single video
pub fn is_youtube_video_url(url: &str) -> bool {
    extract_youtube_video_id(url).is_some()
}

pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Find an embedded YouTube player in page markup
///
/// Only iframes, embeds, objects and `og:video` tags count. Returns the
/// canonical watch URL of the first player in document order.
pub fn find_embedded_youtube_url(html: &str) -> Option<String> {
    let selector = Selector::parse(EMBED_POINTS).ok()?;
    let document = Html::parse_document(html);

    document.select(&selector).find_map(|el| {
        let element = el.value();
        let raw = match element.name() {
            "iframe" | "embed" => element.attr("src"),
            "object" => element.attr("data"),
            _ => element.attr("content"),
        }?
        .trim();
        let absolute = if raw.starts_with("//") {
            format!("https:{}", raw)
        } else {
            raw.to_string()
        };
        extract_youtube_video_id(&absolute).map(|id| youtube_watch_url(&id))
    })
}

/// Resolve the URL used for provider selection and cache keying
pub fn resolve_resource(url: &str, html: Option<&str>) -> ResourceReference {
    let normalized_url = normalize_url(url);

    let effective_url = if is_youtube_video_url(&normalized_url) {
        normalized_url.clone()
    } else {
        html.and_then(find_embedded_youtube_url)
            .unwrap_or_else(|| normalized_url.clone())
    };

    let resource_key = extract_youtube_video_id(&effective_url);

    ResourceReference {
        normalized_url,
        effective_url,
        resource_key,
    }
}

/// Host name without a leading `www.`
pub fn bare_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("  https://example.com/a#section "),
            "https://example.com/a"
        );
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn test_extract_video_id_variants() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(
            extract_youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"),
            id
        );
        assert_eq!(extract_youtube_video_id("https://youtu.be/dQw4w9WgXcQ"), id);
        assert_eq!(
            extract_youtube_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            id
        );
        assert_eq!(
            extract_youtube_video_id("https://youtube.com/shorts/dQw4w9WgXcQ"),
            id
        );
        assert_eq!(
            extract_youtube_video_id("https://www.youtube.com/channel/UC123"),
            None
        );
        assert_eq!(
            extract_youtube_video_id("https://example.com/watch?v=dQw4w9WgXcQ"),
            None
        );
    }

    #[test]
    fn test_find_embedded_youtube_url() {
        let html = r#"<p>Intro</p><iframe src="https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?rel=0"></iframe>"#;
        assert_eq!(
            find_embedded_youtube_url(html),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
        assert_eq!(find_embedded_youtube_url("<p>No video here</p>"), None);
    }

    #[test]
    fn test_find_embedded_youtube_url_other_embed_points() {
        let og = r#"<head><meta property="og:video:url" content="https://www.youtube.com/embed/abcdefghijk"></head>"#;
        assert_eq!(
            find_embedded_youtube_url(og),
            Some("https://www.youtube.com/watch?v=abcdefghijk".to_string())
        );

        let object = r#"<object data="https://www.youtube.com/v/abcdefghijk"></object>"#;
        assert_eq!(
            find_embedded_youtube_url(object),
            Some("https://www.youtube.com/watch?v=abcdefghijk".to_string())
        );

        let other_player = r#"<iframe src="https://player.vimeo.com/video/1"></iframe>
            <iframe src="https://www.youtube.com/embed/abcdefghijk"></iframe>"#;
        assert_eq!(
            find_embedded_youtube_url(other_player),
            Some("https://www.youtube.com/watch?v=abcdefghijk".to_string())
        );
    }

    #[test]
    fn test_find_embedded_youtube_url_ignores_links() {
        let html = r#"<article><p>See <a href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">this talk</a>
            and <a href="https://youtu.be/abcdefghijk">this one</a>.</p>
            <p>Plain text mention: https://www.youtube.com/watch?v=dQw4w9WgXcQ</p></article>"#;
        assert_eq!(find_embedded_youtube_url(html), None);
    }

    #[test]
    fn test_resolve_resource_linked_video_keeps_page() {
        let html = r#"<p>Read on or <a href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">watch</a>.</p>"#;
        let reference = resolve_resource("https://blog.example.com/post", Some(html));
        assert_eq!(reference.effective_url, reference.normalized_url);
        assert!(reference.resource_key.is_none());
    }

    #[test]
    fn test_resolve_resource_channel_page_stays_put() {
        let html = r#"<a href="/watch?v=dQw4w9WgXcQ">Latest</a>
            <a href="https://www.youtube.com/watch?v=abcdefghijk">Older</a>"#;
        let reference = resolve_resource("https://www.youtube.com/@channel", Some(html));
        assert_eq!(reference.effective_url, "https://www.youtube.com/@channel");
        assert!(reference.resource_key.is_none());
    }

    #[test]
    fn test_resolve_resource_uses_embedded_video() {
        let html = r#"<iframe src="//www.youtube.com/embed/abcdefghijk"></iframe>"#;
        let reference = resolve_resource("https://blog.example.com/post", Some(html));
        assert_eq!(reference.normalized_url, "https://blog.example.com/post");
        assert_eq!(
            reference.effective_url,
            "https://www.youtube.com/watch?v=abcdefghijk"
        );
        assert_eq!(reference.resource_key.as_deref(), Some("abcdefghijk"));
    }

    #[test]
    fn test_resolve_resource_keeps_direct_video_url() {
        let html = r#"<iframe src="https://www.youtube.com/embed/abcdefghijk"></iframe>"#;
        let reference = resolve_resource("https://youtu.be/dQw4w9WgXcQ", Some(html));
        assert_eq!(reference.effective_url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(reference.resource_key.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_resolve_resource_plain_page() {
        let reference = resolve_resource("https://example.com/article", None);
        assert_eq!(reference.effective_url, reference.normalized_url);
        assert!(reference.resource_key.is_none());
    }

    #[test]
    fn test_bare_hostname() {
        assert_eq!(
            bare_hostname("https://www.example.com/a"),
            Some("example.com".to_string())
        );
        assert_eq!(bare_hostname("nope"), None);
    }
}
