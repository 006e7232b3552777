//! Pipeline orchestration: crawl, clean, rank, and build the knowledge
//! base in one run, persisting every artifact along the way.

pub mod knowledge;
pub mod pipeline;

pub use knowledge::build_knowledge_base;
pub use pipeline::{run_crawl, CrawlRunOptions, CrawlRunResult, ProgressReporter, SilentProgress};
