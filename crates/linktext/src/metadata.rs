//! Page metadata extraction
//!
//! Pure functions over raw HTML. Malformed markup or JSON never fails, the
//! affected field is simply `None`.

use scraper::{Html, Selector};
use serde_json::Value;

/// Title, description and site name candidates found in a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
}

/// Return the first candidate that is non-empty after trimming
pub fn pick_first_text(candidates: &[Option<&str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

fn title_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// Extract head metadata in precedence order per field
pub fn extract_metadata_from_html(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let og_title = meta_content(&document, r#"meta[property="og:title"]"#);
    let twitter_title = meta_content(&document, r#"meta[name="twitter:title"]"#);
    let title_tag = title_text(&document);

    let og_description = meta_content(&document, r#"meta[property="og:description"]"#);
    let meta_description = meta_content(&document, r#"meta[name="description"]"#);
    let twitter_description = meta_content(&document, r#"meta[name="twitter:description"]"#);

    let og_site = meta_content(&document, r#"meta[property="og:site_name"]"#);
    let app_name = meta_content(&document, r#"meta[name="application-name"]"#);

    PageMetadata {
        title: pick_first_text(&[
            og_title.as_deref(),
            twitter_title.as_deref(),
            title_tag.as_deref(),
        ]),
        description: pick_first_text(&[
            og_description.as_deref(),
            meta_description.as_deref(),
            twitter_description.as_deref(),
        ]),
        site_name: pick_first_text(&[og_site.as_deref(), app_name.as_deref()]),
    }
}

/// Parse the embedded `ytInitialPlayerResponse` JSON blob
pub fn extract_player_response(html: &str) -> Option<Value> {
    const MARKER: &str = "ytInitialPlayerResponse";

    let mut search_from = 0;
    while let Some(found) = html[search_from..].find(MARKER) {
        let after = search_from + found + MARKER.len();
        search_from = after;

        let rest = html[after..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        if !rest.starts_with('{') {
            continue;
        }

        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    None
}

/// YouTube `videoDetails.shortDescription` from the player configuration
pub fn extract_youtube_short_description(html: &str) -> Option<String> {
    let player = extract_player_response(html)?;
    let description = player
        .pointer("/videoDetails/shortDescription")
        .and_then(Value::as_str)?
        .trim();
    (!description.is_empty()).then(|| description.to_string())
}
