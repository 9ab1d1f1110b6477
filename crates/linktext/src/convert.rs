//! HTML to text conversion and prompt normalization

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let trimmed = body.trim_start();
    let head: String = trimmed.chars().take(15).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Convert HTML to plain text, keeping block structure as newlines
pub fn html_to_text(html: &str) -> String {
    let mut output = String::new();
    let mut skip_elements: Vec<String> = Vec::new();

    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let mut tag = String::new();
            while let Some(next) = chars.next() {
                if next == '>' {
                    break;
                }
                tag.push(next);
            }

            let tag_lower = tag.to_lowercase();
            let is_closing = tag_lower.starts_with('/');
            let tag_name = if is_closing {
                tag_lower[1..].split_whitespace().next().unwrap_or("")
            } else {
                tag_lower.split_whitespace().next().unwrap_or("")
            };
            let tag_name = tag_name.trim_end_matches('/');

            let skip_tags = [
                "script", "style", "noscript", "iframe", "svg", "template", "nav", "footer",
                "aside", "form",
            ];
            if skip_tags.contains(&tag_name) {
                if is_closing {
                    if let Some(pos) = skip_elements.iter().rposition(|t| t == tag_name) {
                        skip_elements.remove(pos);
                    }
                } else if !tag.ends_with('/') {
                    skip_elements.push(tag_name.to_string());
                }
                continue;
            }

            if !skip_elements.is_empty() {
                continue;
            }

            let block_tags = [
                "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "section",
                "article", "blockquote", "pre", "ul", "ol", "table", "header", "figure",
            ];
            if block_tags.contains(&tag_name) {
                output.push('\n');
                if matches!(tag_name, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                    output.push('\n');
                }
            } else if tag_name == "li" && !is_closing {
                output.push_str("- ");
            }
        } else if skip_elements.is_empty() {
            let decoded = decode_entity(c, &mut chars);
            output.push(decoded);
        }
    }

    clean_whitespace(&output)
}

/// Decode HTML entity starting from ampersand
fn decode_entity(c: char, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if c != '&' {
        return c;
    }

    // Entities are short; look ahead on a clone so a bare `&` keeps the text after it
    let mut lookahead = chars.clone();
    let mut entity = String::new();
    let mut terminated = false;
    while let Some(next) = lookahead.next() {
        if next == ';' {
            terminated = true;
            break;
        }
        if next.is_whitespace() || entity.len() > 10 {
            break;
        }
        entity.push(next);
    }
    if !terminated {
        return '&';
    }

    let decoded = match entity.as_str() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "hellip" => Some('…'),
        "rsquo" => Some('\''),
        "lsquo" => Some('\''),
        "copy" => Some('©'),
        _ => entity.strip_prefix('#').and_then(|num| {
            let hex = num.strip_prefix('x').or_else(|| num.strip_prefix('X'));
            let code = match hex {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };

    match decoded {
        Some(ch) => {
            // Consume the entity body and the terminating semicolon
            for _ in 0..=entity.chars().count() {
                chars.next();
            }
            ch
        }
        None => '&',
    }
}

/// Clean whitespace: collapse runs, trim, keep max 2 newlines
pub fn clean_whitespace(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            if last_was_space && result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

/// Normalize text before it is handed to a prompt
///
/// Unifies line endings, strips zero-width and control characters and
/// then applies [`clean_whitespace`].
pub fn normalize_for_prompt(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let filtered: String = unified
        .chars()
        .filter(|c| {
            !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}')
                && (!c.is_control() || *c == '\n' || *c == '\t')
        })
        .collect();
    clean_whitespace(&filtered)
}
