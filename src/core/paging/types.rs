//! Paging state and load bookkeeping types.

use crate::core::model::CachedPhoto;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};

/// Which end of the loaded window a load extends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    /// Re-establish the result set
    Refresh,
    /// Extend backwards from the first loaded item
    Prepend,
    /// Extend forwards from the last loaded item
    Append,
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadType::Refresh => write!(f, "refresh"),
            LoadType::Prepend => write!(f, "prepend"),
            LoadType::Append => write!(f, "append"),
        }
    }
}

/// Status of one load direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    NotLoading { end_of_pagination_reached: bool },
    Loading,
    Error(LoadError),
}

impl LoadState {
    pub fn incomplete() -> Self {
        LoadState::NotLoading {
            end_of_pagination_reached: false,
        }
    }

    pub fn complete() -> Self {
        LoadState::NotLoading {
            end_of_pagination_reached: true,
        }
    }

    pub fn is_end_of_pagination(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Load status for all three directions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl Default for LoadStates {
    fn default() -> Self {
        Self {
            refresh: LoadState::incomplete(),
            prepend: LoadState::incomplete(),
            append: LoadState::incomplete(),
        }
    }
}

impl LoadStates {
    pub fn get(&self, load_type: LoadType) -> &LoadState {
        match load_type {
            LoadType::Refresh => &self.refresh,
            LoadType::Prepend => &self.prepend,
            LoadType::Append => &self.append,
        }
    }

    pub fn set(&mut self, load_type: LoadType, state: LoadState) {
        match load_type {
            LoadType::Refresh => self.refresh = state,
            LoadType::Prepend => self.prepend = state,
            LoadType::Append => self.append = state,
        }
    }

    /// First error across directions, refresh first
    pub fn first_error(&self) -> Option<&LoadError> {
        self.refresh
            .error()
            .or_else(|| self.append.error())
            .or_else(|| self.prepend.error())
    }

    pub fn is_loading(&self) -> bool {
        [&self.refresh, &self.prepend, &self.append]
            .iter()
            .any(|state| matches!(state, LoadState::Loading))
    }
}

/// Sizing for a pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Items per page
    pub page_size: usize,
    /// Items loaded before pages are dropped from the far end
    pub max_size: usize,
    /// Items read by a refresh
    pub initial_load_size: usize,
}

impl PagingConfig {
    /// Standard sizing: a `3 × page_size` window and initial load
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            max_size: page_size * 3,
            initial_load_size: page_size * 3,
        }
    }
}

/// A contiguous run of cached photos read in one local load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Offset of the first item within the cached results for the query
    pub offset: usize,
    pub items: Vec<CachedPhoto>,
}

impl Page {
    pub fn end(&self) -> usize {
        self.offset + self.items.len()
    }
}

/// Snapshot of what a pager has loaded, handed to the remote mediator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingState {
    pub pages: Vec<Page>,
    /// Index into the loaded items of the last position the consumer read
    pub anchor_position: Option<usize>,
    pub config: PagingConfig,
}

impl PagingState {
    fn loaded_items(&self) -> impl Iterator<Item = &CachedPhoto> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    /// Loaded item nearest to `position`, clamped to the loaded range
    pub fn closest_item_to_position(&self, position: usize) -> Option<&CachedPhoto> {
        let count = self.loaded_items().count();
        if count == 0 {
            return None;
        }
        self.loaded_items().nth(position.min(count - 1))
    }

    /// First item of the first non-empty page
    pub fn first_item(&self) -> Option<&CachedPhoto> {
        self.pages
            .iter()
            .find(|page| !page.items.is_empty())
            .and_then(|page| page.items.first())
    }

    /// Last item of the last non-empty page
    pub fn last_item(&self) -> Option<&CachedPhoto> {
        self.pages
            .iter()
            .rev()
            .find(|page| !page.items.is_empty())
            .and_then(|page| page.items.last())
    }

    pub fn is_empty(&self) -> bool {
        self.first_item().is_none()
    }
}
