//! Event type definitions for progress reporting.

use crate::core::paging::LoadType;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};

/// All events emitted by the search client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Pager load events
    Paging(PagingEvent),
    /// Search session events
    Search(SearchEvent),
    /// Requests to move between screens
    Navigation(NavigationEvent),
}

/// Events from a pager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PagingEvent {
    /// A load has started
    LoadStarted { query: String, load_type: LoadType },
    /// A load finished; `items_loaded` counts items added to the window
    LoadCompleted {
        query: String,
        load_type: LoadType,
        items_loaded: usize,
        end_of_pagination_reached: bool,
    },
    /// A load failed and can be retried
    LoadFailed {
        query: String,
        load_type: LoadType,
        error: LoadError,
    },
    /// Pages were dropped to keep the window within its maximum size
    PagesDropped { query: String, items_dropped: usize },
}

/// Events from a search session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchEvent {
    /// A settled query was sent to the repository
    QueryDispatched { query: String, generation: u64 },
    /// Results for a query were published to the session state
    ResultsUpdated { query: String, photo_count: usize },
    /// A load for the current query failed
    Failed { query: String, error: LoadError },
    /// A newer query arrived before this one's results were published
    Superseded { query: String },
}

/// Navigation requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationEvent {
    /// Open the detail view for a photo
    ToDetail { photo_id: u64 },
    /// Leave the current view
    Up,
}
