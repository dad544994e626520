//! In-memory photo source for testing.

use super::{PhotoDto, PhotoSource, SearchRequest, SearchResponse};
use crate::core::model::Photo;
use crate::error::RemoteError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct SourceState {
    pages: HashMap<(String, u32), Vec<Photo>>,
    failures: VecDeque<RemoteError>,
    requests: Vec<SearchRequest>,
}

/// Photo source serving pre-registered pages
///
/// Unregistered pages come back empty, which reads as the end of the
/// results. Queued failures are returned, one per request, before any page.
#[derive(Default)]
pub struct InMemorySource {
    state: Mutex<SourceState>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the photos returned for `query` at `page`
    pub fn with_page(self, query: &str, page: u32, photos: Vec<Photo>) -> Self {
        self.set_page(query, page, photos);
        self
    }

    pub fn set_page(&self, query: &str, page: u32, photos: Vec<Photo>) {
        if let Ok(mut state) = self.state.lock() {
            state.pages.insert((query.to_string(), page), photos);
        }
    }

    /// Make the next request fail with `error`
    pub fn fail_next(&self, error: RemoteError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push_back(error);
        }
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.state
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.requests.len())
            .unwrap_or(0)
    }
}

impl PhotoSource for InMemorySource {
    fn search_photos(&self, request: &SearchRequest) -> Result<SearchResponse, RemoteError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RemoteError::InvalidRequest("source state poisoned".to_string()))?;

        state.requests.push(request.clone());

        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let photos = state
            .pages
            .get(&(request.query.clone(), request.page))
            .cloned()
            .unwrap_or_default();

        Ok(SearchResponse {
            total: photos.len() as u64,
            total_hits: photos.len() as u64,
            images: photos.iter().map(PhotoDto::from).collect(),
        })
    }
}
