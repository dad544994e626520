//! # Config Module
//!
//! Runtime configuration for the search client.
//!
//! Values come from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Environment (`PIXABAY_API_KEY`, `PIXABAY_BASE_URL`)
//! 3. Explicit setters (the CLI maps its flags onto these)

use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Number of photos requested per remote page
pub const NETWORK_PAGE_SIZE: u32 = 20;

/// Query searched when a session starts
pub const DEFAULT_QUERY: &str = "fruits";

pub const DEFAULT_BASE_URL: &str = "https://pixabay.com/";

pub const API_KEY_ENV: &str = "PIXABAY_API_KEY";
pub const BASE_URL_ENV: &str = "PIXABAY_BASE_URL";

/// Configuration for the search client
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// PixaBay API key
    pub api_key: Option<String>,
    /// API root, the `api/` path is appended to it
    pub base_url: String,
    /// Photos per remote page
    pub page_size: u32,
    /// Quiet period before a typed query is dispatched
    pub debounce: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Query a new session starts with
    pub initial_query: String,
    /// Whether a pager refreshes from the network before its first read
    pub launch_initial_refresh: bool,
    /// SQLite cache location
    pub cache_path: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: NETWORK_PAGE_SIZE,
            debounce: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            initial_query: DEFAULT_QUERY.to_string(),
            launch_initial_refresh: true,
            cache_path: default_cache_path(),
        }
    }
}

impl SearchConfig {
    /// Defaults overlaid with whatever the environment provides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        config
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn initial_query(mut self, query: impl Into<String>) -> Self {
        self.initial_query = query.into();
        self
    }

    pub fn launch_initial_refresh(mut self, launch: bool) -> Self {
        self.launch_initial_refresh = launch;
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Check values that would otherwise fail deep inside a load
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(3..=200).contains(&self.page_size) {
            return Err(ConfigError::InvalidPageSize {
                value: self.page_size,
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        Ok(())
    }
}

/// `<cache dir>/photo-search/photos.db`, or the working directory when the
/// platform has no cache dir
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-search")
        .join("photos.db")
}
