//! # Photo Search
//!
//! An offline-first client for the PixaBay image search API.
//!
//! ## How it works
//! - Results are always read from a local cache
//! - A remote mediator fetches pages when a read reaches the edge of the cache
//! - Typed queries are debounced and only the latest one publishes results
//!
//! ## Architecture
//! - `core` - The search engine
//! - `config` - Client settings
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::SearchConfig;
pub use error::{PhotoSearchError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Later calls are
/// ignored.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
