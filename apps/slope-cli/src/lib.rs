//! slope-cli
//!
//! HTTP surface and command-line entry points for the slope RAG pipeline.

pub mod server;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
