//! Main article body extraction
//!
//! Tries semantic containers first, then the element holding the most
//! paragraph text, then the whole body.

use crate::convert::{html_to_text, normalize_for_prompt};
use scraper::{ElementRef, Html, Selector};

/// Below this many characters a container is not considered the article
const MIN_ARTICLE_CHARS: usize = 200;

const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".article-content",
    ".article-body",
    ".entry-content",
    ".story-body",
    "#article-body",
    "#content",
    ".prose",
];

fn element_text(element: &ElementRef) -> String {
    normalize_for_prompt(&html_to_text(&element.html()))
}

/// Extract the readable article text from a page
pub fn extract_article_content(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element_text(&element);
            if text.chars().count() >= MIN_ARTICLE_CHARS {
                return text;
            }
        }
    }

    if let Some(text) = densest_paragraph_container(&document) {
        return text;
    }

    Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next().map(|el| element_text(&el)))
        .unwrap_or_else(|| normalize_for_prompt(&html_to_text(html)))
}

/// Parent element with the largest amount of direct `<p>` text
fn densest_paragraph_container(document: &Html) -> Option<String> {
    let paragraphs = Selector::parse("p").ok()?;

    let mut best: Option<(usize, ElementRef)> = None;
    for paragraph in document.select(&paragraphs) {
        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let score: usize = parent
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "p")
            .map(|child| child.text().map(|t| t.trim().chars().count()).sum::<usize>())
            .sum();
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, parent));
        }
    }

    best.filter(|(score, _)| *score >= MIN_ARTICLE_CHARS)
        .map(|(_, element)| element_text(&element))
}

/// Remove a leading copy of the page title from article text
///
/// Matching is case-insensitive and ignores leading whitespace and control
/// characters.
pub fn strip_leading_title(content: &str, title: Option<&str>) -> String {
    let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
        return content.to_string();
    };

    let body = content.trim_start_matches(|c: char| c.is_whitespace() || c.is_control());

    let mut body_chars = body.char_indices();
    for title_char in title.chars() {
        match body_chars.next() {
            Some((_, body_char)) if body_char.to_lowercase().eq(title_char.to_lowercase()) => {}
            _ => return content.to_string(),
        }
    }

    let rest = match body_chars.next() {
        // Title is only a prefix of a longer word
        Some((_, next)) if next.is_alphanumeric() => return content.to_string(),
        Some((idx, _)) => &body[idx..],
        None => "",
    };
    rest.trim_start().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_paragraph(word: &str) -> String {
        std::iter::repeat(word).take(60).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_extracts_article_element() {
        let html = format!(
            "<html><body><nav>Menu</nav><article><h1>Heading</h1><p>{}</p></article><footer>Footer</footer></body></html>",
            long_paragraph("article")
        );
        let text = extract_article_content(&html);
        assert!(text.starts_with("Heading"));
        assert!(text.contains("article article"));
        assert!(!text.contains("Menu"));
        assert!(!text.contains("Footer"));
    }

    #[test]
    fn test_falls_back_to_densest_container() {
        let html = format!(
            "<html><body><div class='sidebar'><p>short</p></div><div class='story'><p>{}</p><p>{}</p></div></body></html>",
            long_paragraph("alpha"),
            long_paragraph("beta")
        );
        let text = extract_article_content(&html);
        assert!(text.contains("alpha"));
        assert!(text.contains("beta"));
        assert!(!text.contains("short"));
    }

    #[test]
    fn test_falls_back_to_body() {
        let text = extract_article_content("<html><body><p>Tiny page</p></body></html>");
        assert_eq!(text, "Tiny page");
    }

    #[test]
    fn test_strip_leading_title() {
        assert_eq!(
            strip_leading_title("\u{0007}  my title\n\nBody text", Some("My Title")),
            "Body text"
        );
        assert_eq!(
            strip_leading_title("Other start\nBody", Some("My Title")),
            "Other start\nBody"
        );
        assert_eq!(strip_leading_title("Body", None), "Body");
        assert_eq!(strip_leading_title("My", Some("My Title")), "My");
        assert_eq!(strip_leading_title("Rustacean life", Some("Rust")), "Rustacean life");
    }
}
