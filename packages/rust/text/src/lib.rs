//! Text processing for TopicBase.
//!
//! Turns raw visible page text into retained prose sentences, and cleaned
//! text into the token stream the ranking layer counts.

pub mod clean;
pub mod tokenize;

pub use clean::clean_text;
pub use tokenize::tokenize;
