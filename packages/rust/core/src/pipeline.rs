//! End-to-end crawl pipeline.
//!
//! A run walks the full chain: select sites from the seed page, fetch
//! their bodies, extract and clean visible text, rank terms with tf-idf,
//! collect curated-term facts, and persist every artifact plus a run
//! record. Only the seed fetch is fatal; individual sites that fail to
//! fetch are dropped and the run continues with the rest.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use topicbase_crawler::{visible_text, Crawler};
use topicbase_ranking::{build_index, SiteTokens};
use topicbase_shared::{AppConfig, CrawlSettings, Result, RunId, Site};
use topicbase_storage::{
    clean_text_key, raw_text_key, Storage, KNOWLEDGE_BASE_KEY, TERM_INDEX_KEY,
};
use topicbase_text::{clean_text, tokenize};

use crate::knowledge::build_knowledge_base;

// --- Options and result types ---

/// Everything a crawl run needs, resolved by the caller.
#[derive(Debug, Clone)]
pub struct CrawlRunOptions {
    /// Seed page URL. Defaults to the configured topic seed unless a
    /// flag overrides it.
    pub seed_url: String,
    /// Database file backing the run.
    pub db_path: PathBuf,
    /// Full application config (crawl, cleaning, knowledge sections).
    pub config: AppConfig,
}

/// Summary of a finished crawl run.
#[derive(Debug, Clone)]
pub struct CrawlRunResult {
    pub run_id: RunId,
    /// Sites chosen during selection, seed included.
    pub sites_selected: usize,
    /// Sites whose bodies made it into the working set.
    pub sites_fetched: usize,
    /// Selected sites dropped because their fetch failed.
    pub sites_dropped: usize,
    /// Deduplicated ranked terms across the whole working set.
    pub global_terms: Vec<String>,
    /// Total facts collected over all curated terms.
    pub fact_count: usize,
    pub elapsed: Duration,
}

// --- Progress reporting ---

/// Callback surface for long-running pipeline phases.
///
/// Implementations must be cheap; the pipeline calls them inline.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline phase started.
    fn phase(&self, name: &str);
    /// A site body was fetched and extracted.
    fn site_fetched(&self, url: &str, current: usize, total: usize);
    /// The run finished.
    fn done(&self, result: &CrawlRunResult);
}

/// No-op reporter for tests and embedding.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn site_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &CrawlRunResult) {}
}

// --- Pipeline ---

/// Run one full crawl and persist its artifacts.
#[instrument(skip_all, fields(seed = %options.seed_url))]
pub async fn run_crawl(
    options: &CrawlRunOptions,
    progress: &dyn ProgressReporter,
) -> Result<CrawlRunResult> {
    let started = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, seed = %options.seed_url, "starting crawl run");

    // --- Phase 1: Storage ---
    progress.phase("Opening storage");
    let storage = Storage::open(&options.db_path).await?;
    storage.insert_crawl_run(&run_id, &options.seed_url).await?;

    // --- Phase 2: Site selection ---
    // The seed fetch is the only fatal one; without it there are no
    // links to follow.
    progress.phase("Selecting sites");
    let crawler = Crawler::new(CrawlSettings::from(&options.config))?;
    let seed_html = crawler.fetch_page(&options.seed_url).await?;
    let selected = crawler.select_sites(&options.seed_url, &seed_html).await;

    // --- Phase 3: Fetch the working set ---
    progress.phase("Fetching sites");
    let mut sites: Vec<Site> = Vec::with_capacity(selected.len());
    let mut sites_dropped = 0usize;

    // Slot 0 is the seed and its body is already in hand.
    let mut seed_site = Site::new(1, selected[0].clone());
    seed_site.raw_text = visible_text(&seed_html);
    sites.push(seed_site);
    progress.site_fetched(&selected[0], 1, selected.len());

    let rest = &selected[1..];
    let bodies = crawler.fetch_all(rest).await;
    for (slot, (url, body)) in rest.iter().zip(bodies).enumerate() {
        match body {
            Ok(html) => {
                let mut site = Site::new(sites.len() + 1, url.clone());
                site.raw_text = visible_text(&html);
                sites.push(site);
                progress.site_fetched(url, slot + 2, selected.len());
            }
            Err(e) if e.is_site_scoped() => {
                warn!(%url, error = %e, "site fetch failed, dropping it from the run");
                sites_dropped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    // --- Phase 4: Clean text ---
    progress.phase("Cleaning text");
    for site in &mut sites {
        site.cleaned_sentences = clean_text(&site.raw_text, &options.config.cleaning.boilerplate);
        debug!(
            site_id = site.id,
            sentences = site.cleaned_sentences.len(),
            "cleaned site text"
        );
    }

    // --- Phase 5: Persist site artifacts ---
    // Stale keys from an earlier, larger run would otherwise survive.
    progress.phase("Writing artifacts");
    storage.delete_prefix("site/").await?;
    for site in &sites {
        storage.put_json(&raw_text_key(site.id), &site.raw_text).await?;
        storage
            .put_json(&clean_text_key(site.id), &site.cleaned_sentences)
            .await?;
    }

    // --- Phase 6: Rank terms ---
    progress.phase("Ranking terms");
    let site_tokens: Vec<SiteTokens> = sites
        .iter()
        .map(|site| SiteTokens {
            site_id: site.id,
            source_url: site.source_url.clone(),
            tokens: tokenize(&site.cleaned_sentences.join(" ")),
        })
        .collect();
    let index = build_index(&site_tokens, options.config.knowledge.top_terms_per_site);
    storage.put_json(TERM_INDEX_KEY, &index).await?;

    // --- Phase 7: Knowledge base ---
    progress.phase("Building knowledge base");
    let kb = build_knowledge_base(&sites, &options.config.knowledge);
    storage.put_json(KNOWLEDGE_BASE_KEY, &kb).await?;

    // --- Phase 8: Finish the run record ---
    let stats = serde_json::json!({
        "sites_selected": selected.len(),
        "sites_fetched": sites.len(),
        "sites_dropped": sites_dropped,
        "global_terms": index.global_terms.len(),
        "facts": kb.fact_count(),
    });
    storage.finish_crawl_run(&run_id, &stats.to_string()).await?;

    let result = CrawlRunResult {
        run_id,
        sites_selected: selected.len(),
        sites_fetched: sites.len(),
        sites_dropped,
        global_terms: index.global_terms,
        fact_count: kb.fact_count(),
        elapsed: started.elapsed(),
    };
    info!(
        run_id = %result.run_id,
        sites = result.sites_fetched,
        dropped = result.sites_dropped,
        terms = result.global_terms.len(),
        facts = result.fact_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "crawl run complete"
    );
    progress.done(&result);

    Ok(result)
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use topicbase_shared::{KnowledgeBase, TopicBaseError};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("tb_core_{}.db", Uuid::now_v7()))
    }

    fn options(seed_url: String, db_path: PathBuf, site_count: usize) -> CrawlRunOptions {
        let mut config = AppConfig::default();
        config.defaults.site_count = site_count;
        config.defaults.concurrency = 2;
        config.defaults.timeout_secs = 5;
        CrawlRunOptions { seed_url, db_path, config }
    }

    fn page(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(format!("<html><body>{body}</body></html>"))
    }

    async fn mount_seed(server: &MockServer, links: &[&str]) {
        let anchors: String = links
            .iter()
            .map(|l| format!("<a href=\"{}{}\">{}</a>", server.uri(), l, l))
            .collect();
        Mock::given(method("GET"))
            .and(path("/bay/seed"))
            .respond_with(page(&format!(
                "<p>The Bay is a large estuary. Ships cross the Bay daily.</p>{anchors}"
            )))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_run_persists_every_artifact() {
        let server = MockServer::start().await;
        mount_seed(&server, &["/bay/towns", "/bay/museum"]).await;
        Mock::given(method("GET"))
            .and(path("/bay/towns"))
            .respond_with(page("<p>Alviso is a small town. The town sits on the Bay.</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bay/museum"))
            .respond_with(page("<p>The museum documents shipyards. War changed everything.</p>"))
            .mount(&server)
            .await;

        let db_path = temp_db();
        let opts = options(format!("{}/bay/seed", server.uri()), db_path.clone(), 3);
        let result = run_crawl(&opts, &SilentProgress).await.unwrap();

        assert_eq!(result.sites_selected, 3);
        assert_eq!(result.sites_fetched, 3);
        assert_eq!(result.sites_dropped, 0);
        assert!(!result.global_terms.is_empty());
        assert!(result.fact_count > 0);

        let storage = Storage::open_readonly(&db_path).await.unwrap();
        let raw: Option<String> = storage.get_json(&raw_text_key(1)).await.unwrap();
        assert!(raw.unwrap().contains("Bay"));
        let clean: Option<Vec<String>> = storage.get_json(&clean_text_key(2)).await.unwrap();
        assert!(clean.unwrap().iter().any(|s| s.contains("Alviso")));

        let index: topicbase_ranking::TermIndex =
            storage.get_json(TERM_INDEX_KEY).await.unwrap().unwrap();
        assert_eq!(index.per_site.len(), 3);
        assert!(index.global_terms.contains(&"bay".to_string()));

        let kb: KnowledgeBase = storage.get_json(KNOWLEDGE_BASE_KEY).await.unwrap().unwrap();
        assert!(kb.facts_for("Alviso").unwrap().iter().any(|f| f.contains("Alviso")));

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn failed_site_is_dropped_and_run_continues() {
        let server = MockServer::start().await;
        mount_seed(&server, &["/bay/flaky", "/bay/solid"]).await;
        // First hit (the reachability probe) succeeds, then the mock
        // expires and the fetch sees a 404.
        Mock::given(method("GET"))
            .and(path("/bay/flaky"))
            .respond_with(page("<p>Short lived.</p>"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bay/solid"))
            .respond_with(page("<p>The town endures on the Bay.</p>"))
            .mount(&server)
            .await;

        let db_path = temp_db();
        let opts = options(format!("{}/bay/seed", server.uri()), db_path.clone(), 3);
        let result = run_crawl(&opts, &SilentProgress).await.unwrap();

        assert_eq!(result.sites_selected, 3);
        assert_eq!(result.sites_fetched, 2);
        assert_eq!(result.sites_dropped, 1);

        // Site ids stay consecutive after the drop.
        let storage = Storage::open_readonly(&db_path).await.unwrap();
        let index: topicbase_ranking::TermIndex =
            storage.get_json(TERM_INDEX_KEY).await.unwrap().unwrap();
        assert_eq!(index.per_site.len(), 2);
        assert!(index.per_site[1].source_url.ends_with("/bay/solid"));
        let missing: Option<String> = storage.get_json(&raw_text_key(3)).await.unwrap();
        assert!(missing.is_none());

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn seed_fetch_failure_is_fatal() {
        let server = MockServer::start().await;
        // No mock for the seed path, so the server answers 404.
        let db_path = temp_db();
        let opts = options(format!("{}/bay/seed", server.uri()), db_path.clone(), 3);
        let err = run_crawl(&opts, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, TopicBaseError::NotFound { .. }));
        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn rerun_clears_stale_site_artifacts() {
        let server = MockServer::start().await;
        mount_seed(&server, &["/bay/towns", "/bay/museum"]).await;
        Mock::given(method("GET"))
            .and(path("/bay/towns"))
            .respond_with(page("<p>A town by the Bay.</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bay/museum"))
            .respond_with(page("<p>A museum by the Bay.</p>"))
            .mount(&server)
            .await;

        let db_path = temp_db();
        let seed = format!("{}/bay/seed", server.uri());
        let first = run_crawl(&options(seed.clone(), db_path.clone(), 3), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(first.sites_fetched, 3);

        // Second run with a smaller quota must not leave site 3 behind.
        let second = run_crawl(&options(seed, db_path.clone(), 2), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(second.sites_fetched, 2);

        let storage = Storage::open_readonly(&db_path).await.unwrap();
        let stale: Option<String> = storage.get_json(&raw_text_key(3)).await.unwrap();
        assert!(stale.is_none());
        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn run_record_carries_stats() {
        let server = MockServer::start().await;
        mount_seed(&server, &[]).await;

        let db_path = temp_db();
        let opts = options(format!("{}/bay/seed", server.uri()), db_path.clone(), 1);
        let result = run_crawl(&opts, &SilentProgress).await.unwrap();

        let storage = Storage::open_readonly(&db_path).await.unwrap();
        let record = storage.latest_run().await.unwrap().unwrap();
        assert_eq!(record.id, result.run_id.to_string());
        assert_eq!(record.seed_url, opts.seed_url);
        assert!(record.finished_at.is_some());
        let stats: serde_json::Value =
            serde_json::from_str(record.stats_json.as_deref().unwrap()).unwrap();
        assert_eq!(stats["sites_fetched"], 1);
        let _ = std::fs::remove_file(&db_path);
    }
}
