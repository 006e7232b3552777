//! Topical site acquisition for TopicBase.
//!
//! - [`engine`]: seed fetch, reachability probing, bounded concurrent fetch
//! - [`links`]: candidate link selection from seed-page HTML
//! - [`extract`]: visible-text extraction from fetched pages

pub mod engine;
pub mod extract;
pub mod links;

pub use engine::{Crawler, Reachability};
pub use extract::visible_text;
pub use links::extract_candidates;
