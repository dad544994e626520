//! PixaBay HTTP API client.

use super::{PhotoSource, SearchRequest, SearchResponse};
use crate::config::SearchConfig;
use crate::error::{ConfigError, RemoteError};
use reqwest::blocking::Client;
use reqwest::Url;
use std::fmt;

/// Blocking client for `GET {base_url}/api/`
pub struct PixabayClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for PixabayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep the API key out of logs
        f.debug_struct("PixabayClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl PixabayClient {
    /// Build a client from configuration. Requires an API key.
    pub fn new(config: &SearchConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let endpoint = Self::endpoint_for(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("photo-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        tracing::info!(endpoint = %endpoint, "photo search client ready");

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Resolve `api/` against the base URL, tolerating a missing trailing slash
    fn endpoint_for(base_url: &str) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("api/").map_err(|e| invalid(e.to_string()))
    }

    /// Full request URL for a page, API key included
    fn request_url(&self, request: &SearchRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("key", &self.api_key)
                .append_pair("q", &request.query)
                .append_pair("page", &request.page.to_string());
            if let Some(per_page) = request.per_page {
                pairs.append_pair("per_page", &per_page.to_string());
            }
        }
        url
    }
}

impl PhotoSource for PixabayClient {
    fn search_photos(&self, request: &SearchRequest) -> Result<SearchResponse, RemoteError> {
        if request.page == 0 {
            return Err(RemoteError::InvalidRequest(
                "page index is 1-based".to_string(),
            ));
        }

        let url = self.request_url(request);
        // Logged without the query string so the key never leaks
        let display_url = self.endpoint.to_string();

        tracing::debug!(query = %request.query, page = request.page, "fetching photo page");

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout {
                    url: display_url.clone(),
                }
            } else {
                RemoteError::Network {
                    url: display_url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "photo search request rejected");
            return Err(RemoteError::Http {
                status: status.as_u16(),
                url: display_url,
            });
        }

        let body = response.text().map_err(|e| RemoteError::Network {
            url: display_url.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&body).map_err(|e| RemoteError::Decode {
            url: display_url,
            reason: e.to_string(),
        })
    }
}
