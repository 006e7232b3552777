//! Curated-term knowledge base construction.
//!
//! Facts are whole cleaned sentences. A sentence counts as a fact for a
//! term when it contains the term verbatim (case-sensitive substring),
//! so "Bay" and "bay" are distinct curated terms.

use std::collections::HashSet;

use tracing::{debug, instrument};

use topicbase_shared::{KnowledgeBase, KnowledgeConfig, Site};

/// Collect facts for every curated term from the crawled working set.
///
/// Sites are scanned in id order and sentences in document order, so the
/// facts for a term are the first `facts_per_term` matching sentences of
/// the whole crawl (none at all when the quota is zero). A duplicated
/// curated term is scanned once; terms with no matching sentence keep an
/// empty list.
#[instrument(skip_all, fields(sites = sites.len(), terms = config.curated_terms.len()))]
pub fn build_knowledge_base(sites: &[Site], config: &KnowledgeConfig) -> KnowledgeBase {
    let mut kb = KnowledgeBase::seeded(&config.curated_terms);

    let mut seen: HashSet<&str> = HashSet::new();
    for term in &config.curated_terms {
        if !seen.insert(term.as_str()) {
            continue;
        }
        let mut found = 0usize;
        'sites: for site in sites {
            for sentence in &site.cleaned_sentences {
                // Checked before the push so the list never exceeds the quota.
                if found >= config.facts_per_term {
                    break 'sites;
                }
                if !sentence.contains(term.as_str()) {
                    continue;
                }
                kb.push_fact(term, sentence.clone());
                found += 1;
            }
        }
        debug!(%term, facts = found, "collected facts for term");
    }

    kb
}
