//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use topicbase_core::pipeline::{CrawlRunOptions, CrawlRunResult, ProgressReporter};
use topicbase_core::run_crawl;
use topicbase_ranking::TermIndex;
use topicbase_shared::{init_config, load_config, resolve_data_dir, AppConfig, KnowledgeBase};
use topicbase_storage::{Storage, KNOWLEDGE_BASE_KEY, TERM_INDEX_KEY};
use tracing::info;
use url::Url;

/// Database file name inside the data directory.
const DB_FILE_NAME: &str = "topicbase.db";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TopicBase — crawl a topic and keep its terms and facts locally.
#[derive(Parser)]
#[command(
    name = "topicbase",
    version,
    about = "Crawl a small set of topical pages into a ranked term index and fact store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl from the seed page and rebuild the term index and knowledge base.
    Crawl {
        /// Seed URL to start from (defaults to the configured topic seed).
        #[arg(long)]
        seed: Option<String>,

        /// How many sites to collect, seed included.
        #[arg(long)]
        sites: Option<usize>,

        /// Data directory for the database (defaults to the configured one).
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Show ranked terms and curated-term coverage from the last crawl.
    Terms {
        /// Data directory for the database.
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Print the recorded facts for one curated term.
    Facts {
        /// Curated term to look up (case-sensitive).
        term: String,

        /// Data directory for the database.
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "topicbase=info",
        1 => "topicbase=debug",
        _ => "topicbase=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            seed,
            sites,
            data_dir,
        } => cmd_crawl(seed.as_deref(), sites, data_dir.as_deref()).await,
        Command::Terms { data_dir } => cmd_terms(data_dir.as_deref()).await,
        Command::Facts { term, data_dir } => cmd_facts(&term, data_dir.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(seed: Option<&str>, sites: Option<usize>, data_dir: Option<&str>) -> Result<()> {
    let mut config = load_config()?;

    if let Some(n) = sites {
        if n == 0 {
            return Err(eyre!("--sites must be at least 1"));
        }
        config.defaults.site_count = n;
    }
    if let Some(dir) = data_dir {
        config.defaults.data_dir = dir.to_string();
    }

    let seed_url = seed
        .map(String::from)
        .unwrap_or_else(|| config.topic.seed_url.clone());
    let parsed = Url::parse(&seed_url).map_err(|e| eyre!("invalid seed URL '{seed_url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(eyre!("seed URL '{seed_url}' must use http or https"));
    }

    let db_path = resolve_data_dir(&config)?.join(DB_FILE_NAME);

    info!(
        seed = %seed_url,
        sites = config.defaults.site_count,
        db = %db_path.display(),
        "starting crawl"
    );

    let reporter = CliProgress::new();
    let options = CrawlRunOptions {
        seed_url,
        db_path: db_path.clone(),
        config,
    };
    let result = run_crawl(&options, &reporter).await?;

    println!();
    println!("  Crawl complete!");
    println!("  Run:    {}", result.run_id);
    println!(
        "  Sites:  {} fetched, {} dropped (of {} selected)",
        result.sites_fetched, result.sites_dropped, result.sites_selected
    );
    println!("  Terms:  {}", result.global_terms.len());
    println!("  Facts:  {}", result.fact_count);
    println!("  Time:   {:.1}s", result.elapsed.as_secs_f64());

    // Show what the run recorded, straight from storage.
    let storage = Storage::open_readonly(&db_path).await?;
    if let Some(index) = storage.get_json::<TermIndex>(TERM_INDEX_KEY).await? {
        print_term_index(&index);
    }
    if let Some(kb) = storage.get_json::<KnowledgeBase>(KNOWLEDGE_BASE_KEY).await? {
        print_knowledge_base(&kb);
    }
    println!();

    Ok(())
}

async fn cmd_terms(data_dir: Option<&str>) -> Result<()> {
    let storage = open_store(data_dir).await?;
    print_run_header(&storage).await?;

    match storage.get_json::<TermIndex>(TERM_INDEX_KEY).await? {
        Some(index) => print_term_index(&index),
        None => println!("No term index recorded yet."),
    }

    if let Some(kb) = storage.get_json::<KnowledgeBase>(KNOWLEDGE_BASE_KEY).await? {
        println!();
        println!("  Curated terms:");
        for (term, facts) in kb.iter() {
            println!("    {term}: {} fact(s)", facts.len());
        }
    }
    println!();

    Ok(())
}

async fn cmd_facts(term: &str, data_dir: Option<&str>) -> Result<()> {
    let storage = open_store(data_dir).await?;
    let Some(kb) = storage.get_json::<KnowledgeBase>(KNOWLEDGE_BASE_KEY).await? else {
        return Err(eyre!(
            "no knowledge base recorded yet, run `topicbase crawl` first"
        ));
    };

    match kb.facts_for(term) {
        None => {
            let known: Vec<&str> = kb.iter().map(|(t, _)| t.as_str()).collect();
            Err(eyre!(
                "'{term}' is not a curated term (known: {})",
                known.join(", ")
            ))
        }
        Some([]) => {
            println!("No facts recorded for '{term}'.");
            Ok(())
        }
        Some(facts) => {
            println!();
            println!("  Facts for '{term}':");
            for (i, fact) in facts.iter().enumerate() {
                println!("    {}. {fact}", i + 1);
            }
            println!();
            Ok(())
        }
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Storage helpers and printing
// ---------------------------------------------------------------------------

/// Open the database read-only, resolving the data directory the same
/// way `crawl` does.
async fn open_store(data_dir: Option<&str>) -> Result<Storage> {
    let mut config = load_config()?;
    if let Some(dir) = data_dir {
        config.defaults.data_dir = dir.to_string();
    }
    let db_path = resolve_data_dir(&config)?.join(DB_FILE_NAME);
    if !db_path.exists() {
        return Err(eyre!(
            "no crawl data at '{}', run `topicbase crawl` first",
            db_path.display()
        ));
    }
    Ok(Storage::open_readonly(&db_path).await?)
}

async fn print_run_header(storage: &Storage) -> Result<()> {
    if let Some(run) = storage.latest_run().await? {
        println!();
        println!("  Last crawl: {} (started {})", run.seed_url, run.started_at);
    }
    Ok(())
}

fn print_term_index(index: &TermIndex) {
    println!();
    println!("  Top terms per site:");
    for site in &index.per_site {
        println!("    [{}] {}", site.site_id, site.source_url);
        if site.top_terms.is_empty() {
            println!("        (no usable text)");
        } else {
            let terms: Vec<String> = site
                .top_terms
                .iter()
                .map(|t| format!("{} ({:.4})", t.term, t.score))
                .collect();
            println!("        {}", terms.join(", "));
        }
    }
    println!();
    println!("  Combined term list ({} terms):", index.global_terms.len());
    println!("    {}", index.global_terms.join(", "));
}

fn print_knowledge_base(kb: &KnowledgeBase) {
    println!();
    println!("  Knowledge base:");
    for (term, facts) in kb.iter() {
        println!("    {term}:");
        if facts.is_empty() {
            println!("      (no facts found)");
        } else {
            for (i, fact) in facts.iter().enumerate() {
                println!("      {}. {fact}", i + 1);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn site_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {url}"));
    }

    fn done(&self, _result: &CrawlRunResult) {
        self.spinner.finish_and_clear();
    }
}
