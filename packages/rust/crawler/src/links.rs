//! Topical link selection from the seed page.
//!
//! Candidates are anchor hrefs taken in document order and passed through
//! a substring filter chain; no URL parsing or normalization happens here,
//! so the selected strings are fetched exactly as they appeared.

use scraper::{Html, Selector};

/// Extract candidate site URLs from seed-page HTML, in document order.
///
/// An href survives when it contains a topical keyword (case-sensitive),
/// still starts with `http` after dropping everything from the first `&`,
/// and contains none of the exclusion substrings. Duplicates are kept;
/// the reachability probe downstream tolerates them.
pub fn extract_candidates(html: &str, keywords: &[String], excluded: &[String]) -> Vec<String> {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let mut candidates = Vec::new();
    for el in doc.select(&anchor_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        if !keywords.iter().any(|k| href.contains(k.as_str())) {
            continue;
        }

        // Drop query tails after the first '&'.
        let trimmed = href.split('&').next().unwrap_or(href);

        if !trimmed.starts_with("http") {
            continue;
        }
        if excluded.iter().any(|ex| trimmed.contains(ex.as_str())) {
            continue;
        }

        candidates.push(trimmed.to_string());
    }

    candidates
}
