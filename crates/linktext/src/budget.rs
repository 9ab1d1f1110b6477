//! Character budget and text statistics
//!
//! All lengths are Unicode scalar values, never bytes.

/// Content after applying a character budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgeted {
    pub content: String,
    pub truncated: bool,
    /// Character count before truncation
    pub total_characters: usize,
}

/// Apply an optional character budget without splitting words
///
/// The cut backs off to the last whitespace before the budget boundary; a
/// bare prefix is kept only when the first word alone exceeds the budget.
/// No ellipsis is appended.
pub fn apply_budget(content: &str, max_characters: Option<usize>) -> Budgeted {
    let total_characters = content.chars().count();

    let Some(max) = max_characters.filter(|max| total_characters > *max) else {
        return Budgeted {
            content: content.to_string(),
            truncated: false,
            total_characters,
        };
    };

    let boundary = content
        .char_indices()
        .nth(max)
        .map(|(idx, _)| idx)
        .unwrap_or(content.len());
    let prefix = &content[..boundary];

    let next_is_space = content[boundary..]
        .chars()
        .next()
        .is_some_and(char::is_whitespace);

    let kept = if next_is_space {
        prefix
    } else {
        match prefix.rfind(char::is_whitespace) {
            Some(idx) => &prefix[..idx],
            None => prefix,
        }
    };

    Budgeted {
        content: kept.trim_end().to_string(),
        truncated: true,
        total_characters,
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Character, line and word counts of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    pub characters: usize,
    pub lines: usize,
    pub words: usize,
}

pub fn text_stats(text: &str) -> TextStats {
    TextStats {
        characters: text.chars().count(),
        lines: text.lines().filter(|l| !l.trim().is_empty()).count(),
        words: count_words(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_budget_is_unchanged() {
        let result = apply_budget("hello world", Some(11));
        assert_eq!(result.content, "hello world");
        assert!(!result.truncated);
        assert_eq!(result.total_characters, 11);

        let unlimited = apply_budget("hello world", None);
        assert!(!unlimited.truncated);
    }

    #[test]
    fn test_truncates_at_word_boundary() {
        let result = apply_budget("hello wonderful world", Some(10));
        assert_eq!(result.content, "hello");
        assert!(result.truncated);
        assert_eq!(result.total_characters, 21);
    }

    #[test]
    fn test_cut_exactly_before_space() {
        let result = apply_budget("hello world again", Some(11));
        assert_eq!(result.content, "hello world");
        assert!(result.truncated);
    }

    #[test]
    fn test_first_word_longer_than_budget() {
        let result = apply_budget("supercalifragilistic rest", Some(5));
        assert_eq!(result.content, "super");
        assert!(result.truncated);
    }

    #[test]
    fn test_counts_code_points() {
        // Each of these is multi-byte in UTF-8
        let content = "ééé ààà üüü";
        let within = apply_budget(content, Some(11));
        assert!(!within.truncated);

        let cut = apply_budget(content, Some(9));
        assert_eq!(cut.content, "ééé ààà");
        assert!(cut.content.chars().count() <= 9);
    }

    #[test]
    fn test_truncation_properties() {
        let content = "The quick brown fox jumps over the lazy dog near the river bank";
        for budget in 0..content.len() {
            let result = apply_budget(content, Some(budget));
            assert!(result.truncated);
            assert!(result.content.chars().count() <= budget);
            assert!(content.starts_with(&result.content));
            let next = content[result.content.len()..].chars().next();
            let boundary_ok = result.content.is_empty()
                || next.map_or(true, char::is_whitespace)
                || !result.content.contains(' ');
            assert!(boundary_ok, "split inside a word at budget {}", budget);
        }
    }

    #[test]
    fn test_text_stats() {
        let stats = text_stats("[0:00] one two\n\n[0:05] three");
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.words, 5);
        assert_eq!(stats.characters, 28);
    }
}
