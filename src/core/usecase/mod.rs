//! # Use Case Module
//!
//! Thin policies between sessions and the repository.
//! - `SearchUseCase` - normalizes the query, then searches
//! - `DetailUseCase` - turns a cache miss into a detail error

use crate::core::model::Photo;
use crate::core::paging::Pager;
use crate::core::repository::{PhotoWatch, SearchRepository};
use crate::error::DetailError;
use regex::Regex;
use std::sync::{Arc, OnceLock};

fn whitespace_runs() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Trim, then join the remaining terms with `+`
pub fn normalize_query(query: &str) -> String {
    whitespace_runs().replace_all(query.trim(), "+").into_owned()
}

/// Search photos by free text
#[derive(Clone)]
pub struct SearchUseCase {
    repository: Arc<dyn SearchRepository>,
}

impl SearchUseCase {
    pub fn new(repository: Arc<dyn SearchRepository>) -> Self {
        Self { repository }
    }

    pub fn search(&self, query: &str) -> Pager {
        self.repository.search_photo(&normalize_query(query))
    }
}

/// Look up a single photo for the detail view
#[derive(Clone)]
pub struct DetailUseCase {
    repository: Arc<dyn SearchRepository>,
}

impl DetailUseCase {
    pub fn new(repository: Arc<dyn SearchRepository>) -> Self {
        Self { repository }
    }

    /// Current cached value, with a miss reported as `PhotoNotFound`
    pub fn photo(&self, id: u64) -> Result<Photo, DetailError> {
        self.repository
            .photo_by_id(id)
            .current()
            .map_err(|e| DetailError::Lookup {
                id,
                reason: e.to_string(),
            })?
            .ok_or(DetailError::PhotoNotFound { id })
    }

    /// Live view for callers that follow cache updates
    pub fn watch(&self, id: u64) -> PhotoWatch {
        self.repository.photo_by_id(id)
    }
}
