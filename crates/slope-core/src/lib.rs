//! slope-core
//!
//! Data model, model/index traits, configuration and the ingest-time text
//! pipeline (extraction + chunking) shared by every other crate.

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod pdf;
pub mod traits;
pub mod types;
