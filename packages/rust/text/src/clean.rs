//! Sentence-level cleaning pipeline for extracted page text.
//!
//! Each pass is a function `&str -> _` applied in sequence: strip layout
//! markers and citations, split into sentences, collapse whitespace, then
//! keep only sentences that look like prose.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Run the full cleaning pipeline on raw visible text.
///
/// Returns retained sentences in document order. `boilerplate` holds
/// substrings whose presence disqualifies a sentence (chrome fragments,
/// embedded URLs, analytics strings).
pub fn clean_text(raw: &str, boilerplate: &[String]) -> Vec<String> {
    let stripped = strip_markers(raw);

    let sentences: Vec<String> = split_sentences(&stripped)
        .into_iter()
        .map(|s| collapse_whitespace(&s))
        .filter(|s| keep_sentence(s, boilerplate))
        .collect();

    debug!(
        raw_len = raw.len(),
        kept = sentences.len(),
        "cleaning complete"
    );
    sentences
}

// ---------------------------------------------------------------------------
// Pass 1: Strip layout markers and citations
// ---------------------------------------------------------------------------

/// Remove newlines, tabs, and bracketed citation markers like `[12]` or
/// `[note 3]`.
fn strip_markers(text: &str) -> String {
    static MARKER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\n\t]|\[[^\]]*\]").expect("valid regex"));

    MARKER_RE.replace_all(text, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Sentence splitting
// ---------------------------------------------------------------------------

/// Split text into sentences, each keeping its terminator.
///
/// A sentence ends at `.`, `!`, or `?` when the next character is
/// whitespace (or end of input). Terminators followed by other characters
/// do not split, so decimals like `7.7` and ellipses stay intact.
/// Abbreviations are not special-cased.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = match chars.get(i + 1) {
            None => true,
            Some(&(_, next)) => next.is_whitespace(),
        };
        if at_boundary {
            let end = pos + c.len_utf8();
            sentences.push(text[start..end].to_string());
            start = end;
        }
    }

    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    sentences
}

// ---------------------------------------------------------------------------
// Pass 3: Whitespace normalization
// ---------------------------------------------------------------------------

/// Collapse interior whitespace runs to single spaces and trim the ends.
fn collapse_whitespace(sentence: &str) -> String {
    sentence.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Pass 4: Retention filter
// ---------------------------------------------------------------------------

/// Keep a sentence only if it is non-empty, ends in terminal punctuation,
/// and contains no boilerplate substring.
fn keep_sentence(sentence: &str, boilerplate: &[String]) -> bool {
    if sentence.is_empty() {
        return false;
    }
    if !sentence.ends_with(['.', '!', '?']) {
        return false;
    }
    !boilerplate.iter().any(|b| sentence.contains(b.as_str()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn default_boilerplate() -> Vec<String> {
        vec![
            "/".to_string(),
            "//".to_string(),
            "|".to_string(),
            "Google Tag".to_string(),
        ]
    }

    #[test]
    fn strip_markers_removes_citations() {
        let input = "The Bay[12] is large.[note 3]";
        assert_eq!(strip_markers(input), "The Bay is large.");
    }

    #[test]
    fn strip_markers_removes_tabs_and_newlines() {
        let input = "First\tline\nsecond";
        assert_eq!(strip_markers(input), "Firstlinesecond");
    }

    #[test]
    fn split_preserves_terminators() {
        let sentences = split_sentences("First one. Second two! Third three?");
        assert_eq!(
            sentences,
            vec![
                "First one.".to_string(),
                " Second two!".to_string(),
                " Third three?".to_string(),
            ]
        );
    }

    #[test]
    fn split_does_not_break_decimals() {
        let sentences = split_sentences("The population is 7.7 million today.");
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0], "The population is 7.7 million today.");
    }

    #[test]
    fn split_keeps_ellipsis_together() {
        let sentences = split_sentences("It waited... then moved.");
        assert_eq!(
            sentences,
            vec!["It waited...".to_string(), " then moved.".to_string()]
        );
    }

    #[test]
    fn split_emits_unterminated_tail() {
        let sentences = split_sentences("Complete sentence. Trailing fragment");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], " Trailing fragment");
    }

    #[test]
    fn collapse_whitespace_flattens_runs() {
        assert_eq!(
            collapse_whitespace("  spaced   out \u{a0} text "),
            "spaced out text"
        );
    }

    #[test]
    fn filter_requires_terminal_punctuation() {
        let bp = default_boilerplate();
        assert!(!keep_sentence("Navigation menu", &bp));
        assert!(keep_sentence("A real sentence.", &bp));
        assert!(keep_sentence("Is it real?", &bp));
    }

    #[test]
    fn filter_drops_boilerplate_substrings() {
        let bp = default_boilerplate();
        assert!(!keep_sentence("Visit our site at /bay/area for info.", &bp));
        assert!(!keep_sentence("Google Tag Manager fired.", &bp));
        assert!(!keep_sentence("Home | About | Contact.", &bp));
        assert!(keep_sentence("The bay area has many towns.", &bp));
    }

    #[test]
    fn filter_rejects_empty() {
        assert!(!keep_sentence("", &default_boilerplate()));
    }

    #[test]
    fn clean_text_end_to_end() {
        let raw = "Jump to content Main menu The San Francisco Bay[2] is a shallow estuary. \
                   It drains water from approximately 40 percent of California![7] \
                   See also: List of watersheds";
        let sentences = clean_text(raw, &default_boilerplate());
        assert_eq!(
            sentences,
            vec![
                "Jump to content Main menu The San Francisco Bay is a shallow estuary.".to_string(),
                "It drains water from approximately 40 percent of California!".to_string(),
            ]
        );
    }

    #[test]
    fn clean_text_empty_input() {
        let sentences = clean_text("", &default_boilerplate());
        assert!(sentences.is_empty());
    }
}
