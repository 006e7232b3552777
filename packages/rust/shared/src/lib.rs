//! Shared foundation for TopicBase: configuration, error types, and the
//! domain types passed between the crawl, text, ranking, and storage crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, CleaningConfig, CrawlSettings, DefaultsConfig, KnowledgeConfig, TopicConfig,
    config_file_path, init_config, load_config, load_config_from, resolve_data_dir,
};
pub use error::{Result, TopicBaseError};
pub use types::{KnowledgeBase, RunId, Site};
