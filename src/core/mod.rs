//! # Core Module
//!
//! The UI-agnostic search engine.
//!
//! ## Modules
//! - `model` - Photo entities and views
//! - `remote` - PixaBay search API client
//! - `cache` - Local photo and page key storage
//! - `paging` - Paged windows over cached results
//! - `mediator` - Fills the cache from the remote source
//! - `repository` - Single entry point for photo data
//! - `usecase` - Query normalization and detail lookups
//! - `session` - Search and detail screen state

pub mod cache;
pub mod mediator;
pub mod model;
pub mod paging;
pub mod remote;
pub mod repository;
pub mod session;
pub mod usecase;

// Re-export commonly used types
pub use cache::{InMemoryPhotoStore, PhotoStore, SqlitePhotoStore};
pub use model::{CachedPhoto, PaginationKey, Photo, PhotoView};
pub use paging::{LoadState, LoadStates, LoadType, Pager};
pub use remote::{PhotoSource, PixabayClient};
pub use repository::{PhotoRepository, SearchRepository};
pub use session::{DetailSession, SearchSession, SearchState, UiEvent};
pub use usecase::{normalize_query, DetailUseCase, SearchUseCase};
