//! # Session Module
//!
//! Screen-level state holders with the rendering left to the caller.
//! - `SearchSession` - debounced search with paged results
//! - `DetailSession` - a single cached photo

mod contract;
mod detail;
mod search;

pub use contract::{
    DetailState, ErrorEvent, OneShot, SearchState, UiEvent, NETWORK_ERROR, NO_PHOTO_FOUND,
    SEARCH_NOT_STARTED, UNKNOWN_ERROR, UNKNOWN_ERROR_DETAIL,
};
pub use detail::DetailSession;
pub use search::SearchSession;
