//! # Error Module
//!
//! User-friendly error types for the photo search client.
//!
//! ## Design Principles
//! - **Never panic** on remote data - return errors instead
//! - **Include context** - URLs, status codes, database paths
//! - **Classify for the UI** - every load failure is either a network
//!   problem or something else, and the UI only needs to know which

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoSearchError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Detail error: {0}")]
    Detail(#[from] DetailError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors talking to the photo search API
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Could not reach {url}: {reason}. Check your internet connection.")]
    Network { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Server returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// Whether this failure is a transport problem the user can fix by
    /// reconnecting, as opposed to a protocol-level problem.
    pub fn is_network(&self) -> bool {
        matches!(self, RemoteError::Network { .. } | RemoteError::Timeout { .. })
    }
}

/// Errors that occur with the photo cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Transaction rolled back: {0}")]
    TransactionFailed(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(error: rusqlite::Error) -> Self {
        CacheError::QueryFailed(error.to_string())
    }
}

/// Errors surfaced by the photo detail lookup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetailError {
    #[error("Photo detail not found")]
    PhotoNotFound { id: u64 },

    #[error("Failed to read photo {id} from cache: {reason}")]
    Lookup { id: u64, reason: String },
}

/// Errors in user-supplied configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No API key configured. Set PIXABAY_API_KEY or pass --api-key.")]
    MissingApiKey,

    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Page size must be between 3 and 200, got {value}")]
    InvalidPageSize { value: u32 },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// The two kinds of load failure the UI distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    Network,
    Unknown,
}

/// A failed paging load, as exposed to the UI
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: LoadErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: LoadErrorKind::Unknown,
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind == LoadErrorKind::Network
    }
}

impl From<RemoteError> for LoadError {
    fn from(error: RemoteError) -> Self {
        if error.is_network() {
            LoadError::network(error.to_string())
        } else {
            LoadError::unknown(error.to_string())
        }
    }
}

impl From<CacheError> for LoadError {
    fn from(error: CacheError) -> Self {
        LoadError::unknown(error.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoSearchError>;
