//! Text normalization before synthesis.
//!
//! Chat platforms embed custom emoji as markup (`<:name:id>`, animated
//! `<a:name:id>`). Read aloud, the numeric id is noise; only the name is
//! kept.

use std::sync::LazyLock;

use regex::Regex;

// `None` only if the pattern failed to compile; text then passes through untouched.
static CUSTOM_EMOJI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<a?:(\w+):\d+>").ok());

/// Replace custom emoji markup with the emoji's name and trim the result.
pub fn clean_emojis(text: &str) -> String {
    let replaced = match CUSTOM_EMOJI.as_ref() {
        Some(re) => re.replace_all(text, "$1"),
        None => text.into(),
    };
    replaced.trim().to_string()
}

/// Clean `text` for speech, returning `None` when nothing speakable is left.
pub fn normalize_utterance(text: &str) -> Option<String> {
    let collapsed = clean_emojis(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_static_emoji() {
        assert_eq!(clean_emojis("hello <:wave:123456789>"), "hello wave");
    }

    #[test]
    fn test_clean_animated_emoji() {
        assert_eq!(clean_emojis("<a:party_blob:42> yes"), "party_blob yes");
    }

    #[test]
    fn test_clean_leaves_plain_text() {
        assert_eq!(clean_emojis("  a < b : c > d  "), "a < b : c > d");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(
            normalize_utterance("one\n\n two\t three").as_deref(),
            Some("one two three")
        );
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_utterance("   "), None);
        assert_eq!(normalize_utterance(""), None);
    }
}
