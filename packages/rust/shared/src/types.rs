//! Core domain types for TopicBase runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for crawl-run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// One fetched, extracted, and cleaned page in the working set.
///
/// `id` is the 1-based position in crawl order and stays stable for the
/// whole run. `raw_text` is set by the fetch/extract stage,
/// `cleaned_sentences` by the cleaning stage; after that the site is
/// read-only.
#[derive(Debug, Clone)]
pub struct Site {
    /// 1-based crawl ordinal.
    pub id: usize,
    /// URL the page was fetched from.
    pub source_url: String,
    /// Visible text, pre-clean.
    pub raw_text: String,
    /// Retained sentences, in document order.
    pub cleaned_sentences: Vec<String>,
}

impl Site {
    /// Create an empty site slot for a selected URL.
    pub fn new(id: usize, source_url: impl Into<String>) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            raw_text: String::new(),
            cleaned_sentences: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// Mapping from curated term to its supporting sentences ("facts").
///
/// Backed by a `BTreeMap` so iteration and serialization order are
/// deterministic. Every curated term is present from the start with an
/// empty fact list; the build pass only appends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    facts: BTreeMap<String, Vec<String>>,
}

impl KnowledgeBase {
    /// Create a knowledge base pre-seeded with an empty fact list per term.
    pub fn seeded(terms: &[String]) -> Self {
        Self {
            facts: terms
                .iter()
                .map(|t| (t.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Append a supporting sentence to a term's fact list.
    pub fn push_fact(&mut self, term: &str, sentence: impl Into<String>) {
        self.facts
            .entry(term.to_string())
            .or_default()
            .push(sentence.into());
    }

    /// Facts recorded for a term, if the term is known.
    pub fn facts_for(&self, term: &str) -> Option<&[String]> {
        self.facts.get(term).map(Vec::as_slice)
    }

    /// Number of curated terms.
    pub fn term_count(&self) -> usize {
        self.facts.len()
    }

    /// Total number of recorded facts across all terms.
    pub fn fact_count(&self) -> usize {
        self.facts.values().map(Vec::len).sum()
    }

    /// Iterate terms and their fact lists in deterministic (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.facts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn site_starts_empty() {
        let site = Site::new(1, "https://example.com/bay");
        assert_eq!(site.id, 1);
        assert!(site.raw_text.is_empty());
        assert!(site.cleaned_sentences.is_empty());
    }

    #[test]
    fn knowledge_base_seeding() {
        let kb = KnowledgeBase::seeded(&["Bay".into(), "Alviso".into()]);
        assert_eq!(kb.term_count(), 2);
        assert_eq!(kb.facts_for("Alviso"), Some(&[][..]));
        assert_eq!(kb.facts_for("missing"), None);
        assert_eq!(kb.fact_count(), 0);
    }

    #[test]
    fn knowledge_base_append_and_iterate() {
        let mut kb = KnowledgeBase::seeded(&["Bay".into(), "war".into()]);
        kb.push_fact("Bay", "The Bay is large.");
        kb.push_fact("Bay", "Ships cross the Bay.");

        assert_eq!(kb.facts_for("Bay").map(<[String]>::len), Some(2));
        assert_eq!(kb.fact_count(), 2);

        // BTreeMap iteration is sorted, not insertion-ordered.
        let terms: Vec<&str> = kb.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["Bay", "war"]);
    }

    #[test]
    fn knowledge_base_serialization_roundtrip() {
        let mut kb = KnowledgeBase::seeded(&["Bay".into(), "Alviso".into()]);
        kb.push_fact("Bay", "The Bay is large.");

        let json = serde_json::to_string(&kb).expect("serialize");
        let parsed: KnowledgeBase = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, kb);
        assert_eq!(parsed.facts_for("Alviso"), Some(&[][..]));
    }
}
