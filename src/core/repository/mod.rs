//! # Repository Module
//!
//! Single entry point for photo data. Searches are paged streams read from
//! the cache and kept topped up by a `PhotoRemoteMediator`. Point lookups
//! are cache-only.

mod watch;

pub use watch::PhotoWatch;

use crate::config::SearchConfig;
use crate::core::cache::PhotoStore;
use crate::core::mediator::PhotoRemoteMediator;
use crate::core::paging::{InitializeAction, Pager, PagingConfig};
use crate::core::remote::PhotoSource;
use crate::events::{null_sender, EventSender};
use std::sync::Arc;

/// Source of photo data for use cases
pub trait SearchRepository: Send + Sync {
    /// Paged results for an already normalized query
    fn search_photo(&self, query: &str) -> Pager;

    /// Live view of one cached photo
    fn photo_by_id(&self, id: u64) -> PhotoWatch;
}

/// Repository over a remote source and a local photo store
pub struct PhotoRepository {
    source: Arc<dyn PhotoSource>,
    store: Arc<dyn PhotoStore>,
    page_size: u32,
    initialize_action: InitializeAction,
    events: EventSender,
}

impl PhotoRepository {
    pub fn new(source: Arc<dyn PhotoSource>, store: Arc<dyn PhotoStore>) -> Self {
        Self {
            source,
            store,
            page_size: crate::config::NETWORK_PAGE_SIZE,
            initialize_action: InitializeAction::LaunchInitialRefresh,
            events: null_sender(),
        }
    }

    /// Repository sized and configured from `config`
    pub fn from_config(
        source: Arc<dyn PhotoSource>,
        store: Arc<dyn PhotoStore>,
        config: &SearchConfig,
    ) -> Self {
        let initialize_action = if config.launch_initial_refresh {
            InitializeAction::LaunchInitialRefresh
        } else {
            InitializeAction::SkipInitialRefresh
        };

        Self::new(source, store)
            .page_size(config.page_size)
            .initialize_action(initialize_action)
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn initialize_action(mut self, action: InitializeAction) -> Self {
        self.initialize_action = action;
        self
    }

    /// Pagers created from now on report through `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &Arc<dyn PhotoStore> {
        &self.store
    }

    /// Page size and a three-page retention window
    pub fn paging_config(&self) -> PagingConfig {
        PagingConfig::new(self.page_size as usize)
    }
}

impl SearchRepository for PhotoRepository {
    fn search_photo(&self, query: &str) -> Pager {
        let mediator = PhotoRemoteMediator::new(
            query,
            self.source.clone(),
            self.store.clone(),
            self.page_size,
        )
        .with_initialize_action(self.initialize_action);

        Pager::new(
            query,
            self.store.clone(),
            Arc::new(mediator),
            self.paging_config(),
        )
        .with_events(self.events.clone())
    }

    fn photo_by_id(&self, id: u64) -> PhotoWatch {
        PhotoWatch::new(id, self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::InMemoryPhotoStore;
    use crate::core::model::{sample_photo, Photo};
    use crate::core::remote::InMemorySource;

    fn repository(source: InMemorySource) -> (Arc<InMemorySource>, PhotoRepository) {
        let source = Arc::new(source);
        let store = Arc::new(InMemoryPhotoStore::new());
        let repository = PhotoRepository::new(source.clone(), store).page_size(2);
        (source, repository)
    }

    #[test]
    fn search_photo_streams_remote_pages_through_cache() {
        let (source, repository) = repository(
            InMemorySource::new()
                .with_page("red+panda", 1, vec![sample_photo(1), sample_photo(2)])
                .with_page("red+panda", 2, vec![sample_photo(3)]),
        );

        let mut pager = repository.search_photo("red+panda");
        pager.refresh().unwrap();
        pager.append().unwrap();
        pager.append().unwrap();

        let ids: Vec<u64> = pager.items().iter().map(|photo| photo.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(pager.load_states().append.is_end_of_pagination());
        assert!(source.requests().iter().all(|r| r.per_page == Some(2)));
    }

    #[test]
    fn photo_by_id_reads_cache_only() {
        let (source, repository) =
            repository(InMemorySource::new().with_page("fruits", 1, vec![sample_photo(5)]));

        assert_eq!(repository.photo_by_id(5).current().unwrap(), None);

        repository.search_photo("fruits").refresh().unwrap();
        let photo: Option<Photo> = repository.photo_by_id(5).current().unwrap();

        assert_eq!(photo.map(|p| p.id), Some(5));
        assert_eq!(source.request_count(), 1);
    }

    #[test]
    fn paging_config_keeps_three_pages() {
        let (_source, repository) = repository(InMemorySource::new());
        let config = repository.paging_config();
        assert_eq!(config.page_size, 2);
        assert_eq!(config.max_size, 6);
    }

    #[test]
    fn from_config_respects_initial_refresh_flag() {
        let source: Arc<dyn PhotoSource> = Arc::new(InMemorySource::new());
        let store: Arc<dyn PhotoStore> = Arc::new(InMemoryPhotoStore::new());
        let config = SearchConfig::default()
            .page_size(10)
            .launch_initial_refresh(false);

        let repository = PhotoRepository::from_config(source, store, &config);

        assert_eq!(repository.page_size, 10);
        assert_eq!(
            repository.initialize_action,
            InitializeAction::SkipInitialRefresh
        );
    }
}
