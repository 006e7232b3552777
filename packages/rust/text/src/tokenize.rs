//! Tokenization for term ranking.
//!
//! Lowercases, splits on non-alphanumeric boundaries, and keeps purely
//! alphabetic words that are not English stop words. Output preserves
//! document order and duplicates; term frequency counting happens in the
//! ranking layer.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    stop_words::get(stop_words::LANGUAGE::English)
        .into_iter()
        .collect()
});

/// Tokenize cleaned text into ranking-ready words.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| w.chars().all(char::is_alphabetic))
        .filter(|w| !STOP_WORDS.contains(*w))
        .map(str::to_string)
        .collect()
}
