//! Tokenizing and stemming of trigger terms and incoming text.
//!
//! - [`Stemmer`] is the collaborator the store and matcher depend on
//! - [`PorterStemmer`] is the default: lowercase, split on non-word
//!   characters, drop stopwords, Snowball English stems
//! - [`is_word_like`] decides whether a term goes through the stemmer at all

mod porter;
mod stopwords;

use std::sync::LazyLock;

use regex::Regex;

pub use porter::PorterStemmer;
pub use stopwords::is_stopword;

static WORD_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]{2,}").expect("WORD_RUN regex should compile")
});

/// Turns text into an ordered sequence of stems.
pub trait Stemmer: Send + Sync {
    fn tokenize_and_stem(&self, text: &str) -> Vec<String>;
}

/// True when `text` contains at least one alphanumeric word of two or more
/// characters.
pub fn is_word_like(text: &str) -> bool {
    WORD_RUN.is_match(text)
}

/// Split on anything that is not a letter, digit or underscore.
pub fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() || c == '_' {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start {
            words.push(&text[s..i]);
            start = None;
        }
    }
    if let Some(s) = start {
        words.push(&text[s..]);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_like_needs_two_alphanumerics() {
        assert!(is_word_like("hello"));
        assert!(is_word_like("foo bar"));
        assert!(is_word_like("hello!!"));
        assert!(is_word_like("42"));
        assert!(!is_word_like("!!!"));
        assert!(!is_word_like("a"));
        assert!(!is_word_like("a b c"));
        assert!(!is_word_like(""));
        assert!(!is_word_like(":-)"));
    }

    #[test]
    fn split_on_punctuation() {
        assert_eq!(
            split_words("Hello, world! don't-stop"),
            vec!["Hello", "world", "don", "t", "stop"]
        );
    }

    #[test]
    fn split_keeps_underscores_and_unicode() {
        assert_eq!(split_words("snake_case café"), vec!["snake_case", "café"]);
    }

    #[test]
    fn split_empty() {
        assert!(split_words("").is_empty());
        assert!(split_words("  ?! ").is_empty());
    }
}
