//! TF-IDF term ranking over the crawled working set.
//!
//! Weights use smoothed inverse document frequency,
//! `idf(t) = ln(1 + N / (1 + df(t)))`, where `N` counts sites with at
//! least one token. Smoothing keeps every weight strictly positive, so a
//! term appearing in all documents still outranks absent terms.
//!
//! All output ordering is deterministic: term frequencies carry first-seen
//! order, the per-site sort is stable, and the global term list dedups in
//! site order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Ranking input: one site's token stream.
#[derive(Debug, Clone)]
pub struct SiteTokens {
    /// 1-based crawl ordinal.
    pub site_id: usize,
    /// URL the tokens came from.
    pub source_url: String,
    /// Tokens in document order, duplicates included.
    pub tokens: Vec<String>,
}

/// A term with its TF-IDF weight for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTerm {
    pub term: String,
    pub score: f64,
}

/// The top-ranked terms for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTerms {
    pub site_id: usize,
    pub source_url: String,
    /// Highest-weighted terms, best first. Empty for degenerate sites.
    pub top_terms: Vec<RankedTerm>,
}

/// The full ranking output: per-site top terms plus the deduplicated
/// global term list, in site order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermIndex {
    pub per_site: Vec<SiteTerms>,
    pub global_terms: Vec<String>,
}

// ---------------------------------------------------------------------------
// Index construction
// ---------------------------------------------------------------------------

/// Build the term index for a working set.
///
/// Sites with an empty token stream are degenerate: they keep their slot
/// in `per_site` with no terms, and they do not count toward `N` for the
/// IDF denominator.
pub fn build_index(sites: &[SiteTokens], top_terms_per_site: usize) -> TermIndex {
    let corpus: Vec<&SiteTokens> = sites.iter().filter(|s| !s.tokens.is_empty()).collect();
    let df = document_frequencies(&corpus);
    let idf = inverse_document_frequencies(&df, corpus.len());

    let mut per_site = Vec::with_capacity(sites.len());
    let mut global_terms: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for site in sites {
        if site.tokens.is_empty() {
            warn!(
                site_id = site.site_id,
                url = %site.source_url,
                "no rankable tokens for site"
            );
            per_site.push(SiteTerms {
                site_id: site.site_id,
                source_url: site.source_url.clone(),
                top_terms: Vec::new(),
            });
            continue;
        }

        let mut scored: Vec<RankedTerm> = term_frequencies(&site.tokens)
            .into_iter()
            .map(|(term, tf)| {
                let weight = idf.get(&term).copied().unwrap_or(0.0);
                RankedTerm {
                    score: tf * weight,
                    term,
                }
            })
            .collect();

        // Stable sort keeps first-seen order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_terms_per_site);

        for ranked in &scored {
            if seen.insert(ranked.term.clone()) {
                global_terms.push(ranked.term.clone());
            }
        }

        per_site.push(SiteTerms {
            site_id: site.site_id,
            source_url: site.source_url.clone(),
            top_terms: scored,
        });
    }

    debug!(
        sites = sites.len(),
        ranked = corpus.len(),
        terms = global_terms.len(),
        "term index built"
    );

    TermIndex {
        per_site,
        global_terms,
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Relative term frequencies for one token stream, in first-seen order.
fn term_frequencies(tokens: &[String]) -> Vec<(String, f64)> {
    let total = tokens.len() as f64;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for token in tokens {
        let count = counts.entry(token.as_str()).or_insert(0);
        if *count == 0 {
            order.push(token.as_str());
        }
        *count += 1;
    }

    order
        .into_iter()
        .map(|term| (term.to_string(), counts[term] as f64 / total))
        .collect()
}

/// For each term, the number of corpus sites containing it.
fn document_frequencies(corpus: &[&SiteTokens]) -> HashMap<String, usize> {
    let mut df: HashMap<String, usize> = HashMap::new();
    for site in corpus {
        let unique: HashSet<&str> = site.tokens.iter().map(String::as_str).collect();
        for term in unique {
            *df.entry(term.to_string()).or_insert(0) += 1;
        }
    }
    df
}

/// Smoothed IDF per term: `ln(1 + N / (1 + df))`.
fn inverse_document_frequencies(
    df: &HashMap<String, usize>,
    corpus_size: usize,
) -> HashMap<String, f64> {
    let n = corpus_size as f64;
    df.iter()
        .map(|(term, &count)| {
            let idf = (1.0 + n / (1.0 + count as f64)).ln();
            (term.clone(), idf)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: usize, tokens: &[&str]) -> SiteTokens {
        SiteTokens {
            site_id: id,
            source_url: format!("https://example.com/{id}"),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn two_site_corpus_ranks_as_expected() {
        let sites = vec![site(1, &["bay", "area", "bay"]), site(2, &["bay", "town"])];
        let index = build_index(&sites, 3);

        // N = 2; df(bay) = 2, df(area) = df(town) = 1.
        let idf_bay = (1.0 + 2.0 / 3.0_f64).ln();
        let idf_rare = 2.0_f64.ln();

        let first = &index.per_site[0];
        assert_eq!(first.top_terms.len(), 2);
        assert_eq!(first.top_terms[0].term, "bay");
        assert_close(first.top_terms[0].score, (2.0 / 3.0) * idf_bay);
        assert_eq!(first.top_terms[1].term, "area");
        assert_close(first.top_terms[1].score, (1.0 / 3.0) * idf_rare);

        // On site 2 the rare term outweighs the shared one.
        let second = &index.per_site[1];
        assert_eq!(second.top_terms[0].term, "town");
        assert_close(second.top_terms[0].score, 0.5 * idf_rare);
        assert_eq!(second.top_terms[1].term, "bay");
        assert_close(second.top_terms[1].score, 0.5 * idf_bay);

        // Global list dedups in site order.
        assert_eq!(index.global_terms, vec!["bay", "area", "town"]);
    }

    #[test]
    fn idf_stays_positive_for_ubiquitous_terms() {
        let sites = vec![
            site(1, &["bay"]),
            site(2, &["bay"]),
            site(3, &["bay"]),
        ];
        let index = build_index(&sites, 3);

        for site_terms in &index.per_site {
            assert!(site_terms.top_terms[0].score > 0.0);
        }
    }

    #[test]
    fn degenerate_site_keeps_slot_but_not_counted() {
        let sites = vec![site(1, &["bay", "town"]), site(2, &[]), site(3, &["bay"])];
        let index = build_index(&sites, 3);

        assert_eq!(index.per_site.len(), 3);
        assert!(index.per_site[1].top_terms.is_empty());

        // N = 2 (the empty site is excluded), so df(bay) = 2 gives
        // idf = ln(1 + 2/3) and "town" with df = 1 gives ln(2).
        let bay = &index.per_site[2].top_terms[0];
        assert_eq!(bay.term, "bay");
        assert_close(bay.score, (1.0 + 2.0 / 3.0_f64).ln());
    }

    #[test]
    fn equal_scores_keep_first_seen_order() {
        let index = build_index(&[site(1, &["alpha", "beta"])], 3);
        let terms: Vec<&str> = index.per_site[0]
            .top_terms
            .iter()
            .map(|t| t.term.as_str())
            .collect();
        assert_eq!(terms, vec!["alpha", "beta"]);

        let index = build_index(&[site(1, &["beta", "alpha"])], 3);
        let terms: Vec<&str> = index.per_site[0]
            .top_terms
            .iter()
            .map(|t| t.term.as_str())
            .collect();
        assert_eq!(terms, vec!["beta", "alpha"]);
    }

    #[test]
    fn per_site_list_truncates_to_limit() {
        let index = build_index(
            &[site(1, &["one", "two", "three", "four", "five"])],
            3,
        );
        assert_eq!(index.per_site[0].top_terms.len(), 3);
        assert_eq!(index.global_terms.len(), 3);
    }

    #[test]
    fn empty_corpus_builds_empty_index() {
        let index = build_index(&[], 3);
        assert!(index.per_site.is_empty());
        assert!(index.global_terms.is_empty());
    }

    #[test]
    fn rebuilding_the_same_corpus_is_identical() {
        // Hash-map iteration order must never reach the output.
        let sites = vec![
            site(1, &["bay", "area", "bay", "bridge", "ferry"]),
            site(2, &["bay", "town", "harbor", "ferry"]),
            site(3, &["museum", "war", "bay"]),
        ];
        let first = build_index(&sites, 3);
        for _ in 0..10 {
            assert_eq!(build_index(&sites, 3), first);
        }
    }

    #[test]
    fn term_index_serialization_roundtrip() {
        let index = build_index(&[site(1, &["bay", "area"])], 3);
        let json = serde_json::to_string(&index).expect("serialize");
        let parsed: TermIndex = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, index);
    }
}
