//! Application configuration for TopicBase.
//!
//! User config lives at `~/.topicbase/topicbase.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopicBaseError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "topicbase.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".topicbase";

// ---------------------------------------------------------------------------
// Config structs (matching topicbase.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Topic selection: seed page and link filters.
    #[serde(default)]
    pub topic: TopicConfig,

    /// Sentence cleaning policies.
    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Knowledge base construction.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding the blob database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Number of sites in the working set, seed page included.
    #[serde(default = "default_site_count")]
    pub site_count: usize,

    /// Concurrent network requests (probe and fetch pools).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header; some hosts reject automation-flagged clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            site_count: default_site_count(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_data_dir() -> String {
    "~/topicbase-data".into()
}
fn default_site_count() -> usize {
    15
}
fn default_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0".into()
}

/// `[topic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Seed page the crawl starts from.
    #[serde(default = "default_seed_url")]
    pub seed_url: String,

    /// Case-sensitive substrings an href must contain to be topical.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Substrings that disqualify an href (aggregators, PDFs, mirrors).
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            seed_url: default_seed_url(),
            keywords: default_keywords(),
            excluded: default_excluded(),
        }
    }
}

fn default_seed_url() -> String {
    "https://en.wikipedia.org/wiki/San_Francisco_Bay_Area".into()
}
fn default_keywords() -> Vec<String> {
    vec!["bay".into(), "area".into()]
}
fn default_excluded() -> Vec<String> {
    vec!["google".into(), "pdf".into(), "web.archive".into()]
}

/// `[cleaning]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Tokens marking a sentence as navigation/tracker boilerplate.
    #[serde(default = "default_boilerplate")]
    pub boilerplate: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            boilerplate: default_boilerplate(),
        }
    }
}

fn default_boilerplate() -> Vec<String> {
    vec!["/".into(), "//".into(), "|".into(), "Google Tag".into()]
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Top-ranked tokens taken from each site's TF-IDF ranking.
    #[serde(default = "default_top_terms_per_site")]
    pub top_terms_per_site: usize,

    /// Maximum facts collected per curated term.
    #[serde(default = "default_facts_per_term")]
    pub facts_per_term: usize,

    /// Curated terms the knowledge base is built for.
    #[serde(default = "default_curated_terms")]
    pub curated_terms: Vec<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_terms_per_site: default_top_terms_per_site(),
            facts_per_term: default_facts_per_term(),
            curated_terms: default_curated_terms(),
        }
    }
}

fn default_top_terms_per_site() -> usize {
    3
}
fn default_facts_per_term() -> usize {
    3
}
fn default_curated_terms() -> Vec<String> {
    [
        "California",
        "war",
        "town",
        "museum",
        "Francisco",
        "Bay",
        "downtown",
        "shipyards",
        "data",
        "Alviso",
    ]
    .map(String::from)
    .to_vec()
}

// ---------------------------------------------------------------------------
// Crawl settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl settings, merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Working-set size, seed page included.
    pub site_count: usize,
    /// Bounded worker-pool width for probes and fetches.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent sent on every request.
    pub user_agent: String,
    /// Topical keyword filter (case-sensitive).
    pub keywords: Vec<String>,
    /// Exclusion substrings.
    pub excluded: Vec<String>,
}

impl From<&AppConfig> for CrawlSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            site_count: config.defaults.site_count,
            concurrency: config.defaults.concurrency.max(1),
            timeout: Duration::from_secs(config.defaults.timeout_secs),
            user_agent: config.defaults.user_agent.clone(),
            keywords: config.topic.keywords.clone(),
            excluded: config.topic.excluded.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.topicbase/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TopicBaseError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.topicbase/topicbase.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TopicBaseError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TopicBaseError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TopicBaseError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TopicBaseError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TopicBaseError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the configured data directory, expanding a leading `~/`.
pub fn resolve_data_dir(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.defaults.data_dir;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| TopicBaseError::config("could not determine home directory"))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}
