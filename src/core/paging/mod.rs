//! # Paging Module
//!
//! Serves a query's cached photos a page at a time and asks a remote
//! mediator for more whenever the consumer reaches the edge of the cache.
//!
//! ## Flow
//! 1. **Refresh** - the mediator refetches around the anchor, then the
//!    window is reread from the cache
//! 2. **Append / Prepend** - read the next cached window if there is one,
//!    otherwise let the mediator fetch and reread
//!
//! The mediator only writes to the cache. Everything the consumer sees is
//! read back from it.

mod pager;
mod types;

pub use pager::Pager;
pub use types::{LoadState, LoadStates, LoadType, Page, PagingConfig, PagingState};

use crate::error::LoadError;

/// Whether a pager should hit the network before its first read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeAction {
    LaunchInitialRefresh,
    SkipInitialRefresh,
}

/// Outcome of a successful mediator load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediatorSuccess {
    pub end_of_pagination_reached: bool,
}

pub type MediatorResult = Result<MediatorSuccess, LoadError>;

/// Bridges a remote source into the local cache
pub trait RemoteMediator: Send + Sync {
    fn initialize(&self) -> InitializeAction {
        InitializeAction::LaunchInitialRefresh
    }

    /// Fetch whatever `load_type` needs given what is loaded, and persist it
    fn load(&self, load_type: LoadType, state: &PagingState) -> MediatorResult;
}
