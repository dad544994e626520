//! # Mediator Module
//!
//! Moves remote search pages into the local cache.
//!
//! ## Page keys
//! Every photo written gets a `PaginationKey` naming the pages on either
//! side of the page it came from:
//! - `prev_page` is `page - 1`, or none on page 1
//! - `next_page` is `page + 1`, or none when the page was empty
//!
//! Append and prepend follow those keys from the last or first loaded
//! photo. Refresh starts again from the key nearest the anchor.

use crate::core::cache::PhotoStore;
use crate::core::model::{CachedPhoto, PaginationKey, Photo};
use crate::core::paging::{
    InitializeAction, LoadType, MediatorResult, MediatorSuccess, PagingState, RemoteMediator,
};
use crate::core::remote::{PhotoSource, SearchRequest};
use crate::error::{CacheError, LoadError};
use std::sync::Arc;

/// Remote pages are 1-based
pub const FIRST_PAGE: u32 = 1;

/// Remote mediator for one normalized query
pub struct PhotoRemoteMediator {
    query: String,
    source: Arc<dyn PhotoSource>,
    store: Arc<dyn PhotoStore>,
    page_size: u32,
    initialize_action: InitializeAction,
}

/// Where a load should fetch from
enum PageTarget {
    Fetch(u32),
    /// Nothing to fetch; report this end-of-pagination flag
    Done(bool),
}

impl PhotoRemoteMediator {
    pub fn new(
        query: impl Into<String>,
        source: Arc<dyn PhotoSource>,
        store: Arc<dyn PhotoStore>,
        page_size: u32,
    ) -> Self {
        Self {
            query: query.into(),
            source,
            store,
            page_size,
            initialize_action: InitializeAction::LaunchInitialRefresh,
        }
    }

    /// Choose whether pagers start with a network refresh
    pub fn with_initialize_action(mut self, action: InitializeAction) -> Self {
        self.initialize_action = action;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn key_for(&self, photo: Option<&CachedPhoto>) -> Result<Option<PaginationKey>, CacheError> {
        match photo {
            Some(photo) => self.store.pagination_key(photo.id()),
            None => Ok(None),
        }
    }

    fn target(&self, load_type: LoadType, state: &PagingState) -> Result<PageTarget, CacheError> {
        let target = match load_type {
            LoadType::Refresh => {
                let anchored = match state.anchor_position {
                    Some(position) => self.key_for(state.closest_item_to_position(position))?,
                    None => None,
                };
                let page = anchored
                    .and_then(|key| {
                        key.next_page
                            .map(|next| next - 1)
                            .or_else(|| key.prev_page.map(|prev| prev + 1))
                    })
                    .unwrap_or(FIRST_PAGE);
                PageTarget::Fetch(page)
            }
            LoadType::Prepend => {
                let key = self.key_for(state.first_item())?;
                match key.and_then(|key| key.prev_page) {
                    Some(prev) => PageTarget::Fetch(prev),
                    None => PageTarget::Done(key.is_some()),
                }
            }
            LoadType::Append => {
                let key = self.key_for(state.last_item())?;
                match key.and_then(|key| key.next_page) {
                    Some(next) => PageTarget::Fetch(next),
                    None => PageTarget::Done(key.is_some()),
                }
            }
        };
        Ok(target)
    }

    /// Persist a fetched page and its keys in one transaction
    fn store_page(&self, load_type: LoadType, page: u32, photos: Vec<Photo>) -> Result<(), CacheError> {
        let end_of_pagination_reached = photos.is_empty();
        let prev_page = if page == FIRST_PAGE { None } else { Some(page - 1) };
        let next_page = if end_of_pagination_reached { None } else { Some(page + 1) };

        let keys: Vec<PaginationKey> = photos
            .iter()
            .map(|photo| PaginationKey {
                photo_id: photo.id,
                prev_page,
                next_page,
            })
            .collect();
        let cached: Vec<CachedPhoto> = photos
            .into_iter()
            .map(|photo| CachedPhoto::new(photo, self.query.clone()))
            .collect();

        self.store.transaction(&mut |writer| {
            if load_type == LoadType::Refresh {
                writer.delete_all_keys()?;
                writer.delete_all_photos()?;
            }
            writer.insert_keys(&keys)?;
            if load_type == LoadType::Prepend {
                writer.insert_photos_before(&cached)
            } else {
                writer.insert_photos(&cached)
            }
        })
    }
}

impl RemoteMediator for PhotoRemoteMediator {
    fn initialize(&self) -> InitializeAction {
        self.initialize_action
    }

    fn load(&self, load_type: LoadType, state: &PagingState) -> MediatorResult {
        let page = match self.target(load_type, state)? {
            PageTarget::Fetch(page) => page,
            PageTarget::Done(end_of_pagination_reached) => {
                tracing::debug!(query = %self.query, %load_type, end_of_pagination_reached, "no page key to follow");
                return Ok(MediatorSuccess {
                    end_of_pagination_reached,
                });
            }
        };

        let request = SearchRequest {
            query: self.query.clone(),
            page,
            per_page: Some(self.page_size),
        };

        let response = self.source.search_photos(&request).map_err(LoadError::from)?;
        let photos: Vec<Photo> = response.images.into_iter().map(Photo::from).collect();
        let end_of_pagination_reached = photos.is_empty();

        tracing::info!(
            query = %self.query,
            %load_type,
            page,
            fetched = photos.len(),
            "fetched remote page"
        );

        self.store_page(load_type, page, photos)?;

        Ok(MediatorSuccess {
            end_of_pagination_reached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::InMemoryPhotoStore;
    use crate::core::model::sample_photo;
    use crate::core::paging::{Page, PagingConfig};
    use crate::core::remote::InMemorySource;
    use crate::error::{LoadErrorKind, RemoteError};

    fn photos(ids: std::ops::Range<u64>) -> Vec<Photo> {
        ids.map(sample_photo).collect()
    }

    fn setup(source: InMemorySource) -> (Arc<InMemorySource>, Arc<InMemoryPhotoStore>, PhotoRemoteMediator) {
        let source = Arc::new(source);
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = PhotoRemoteMediator::new("fruits", source.clone(), store.clone(), 3);
        (source, store, mediator)
    }

    fn state_with(store: &InMemoryPhotoStore, anchor: Option<usize>) -> PagingState {
        let items = store.query_photos("fruits", 0, 100).unwrap();
        PagingState {
            pages: vec![Page { offset: 0, items }],
            anchor_position: anchor,
            config: PagingConfig::new(3),
        }
    }

    fn empty_state() -> PagingState {
        PagingState {
            pages: Vec::new(),
            anchor_position: None,
            config: PagingConfig::new(3),
        }
    }

    #[test]
    fn refresh_without_anchor_fetches_first_page() {
        let (source, store, mediator) =
            setup(InMemorySource::new().with_page("fruits", 1, photos(1..4)));

        let result = mediator.load(LoadType::Refresh, &empty_state()).unwrap();

        assert!(!result.end_of_pagination_reached);
        assert_eq!(source.requests()[0].page, 1);
        assert_eq!(source.requests()[0].per_page, Some(3));
        assert_eq!(store.count_photos("fruits").unwrap(), 3);

        let key = store.pagination_key(1).unwrap().unwrap();
        assert_eq!(key.prev_page, None);
        assert_eq!(key.next_page, Some(2));
    }

    #[test]
    fn refresh_replaces_cache_with_fetched_page() {
        let (_source, store, mediator) =
            setup(InMemorySource::new().with_page("fruits", 1, photos(10..13)));
        store
            .insert_photos(&[
                CachedPhoto::new(sample_photo(1), "cats"),
                CachedPhoto::new(sample_photo(2), "fruits"),
            ])
            .unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 2,
                prev_page: None,
                next_page: Some(2),
            }])
            .unwrap();

        mediator.load(LoadType::Refresh, &empty_state()).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_photos, 3);
        assert_eq!(stats.total_keys, 3);
        assert_eq!(stats.search_terms, vec!["fruits"]);
        assert!(store.photo(1).unwrap().is_none());
        assert!(store.pagination_key(2).unwrap().is_none());
    }

    #[test]
    fn refresh_refetches_page_nearest_anchor() {
        let (source, store, mediator) =
            setup(InMemorySource::new().with_page("fruits", 3, photos(7..10)));
        store
            .insert_photos(&[CachedPhoto::new(sample_photo(7), "fruits")])
            .unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 7,
                prev_page: Some(2),
                next_page: Some(4),
            }])
            .unwrap();

        let state = state_with(&store, Some(0));
        mediator.load(LoadType::Refresh, &state).unwrap();

        assert_eq!(source.requests()[0].page, 3);
        let key = store.pagination_key(8).unwrap().unwrap();
        assert_eq!(key.prev_page, Some(2));
        assert_eq!(key.next_page, Some(4));
    }

    #[test]
    fn refresh_at_last_page_uses_previous_key() {
        let (source, store, mediator) = setup(InMemorySource::new());
        store
            .insert_photos(&[CachedPhoto::new(sample_photo(7), "fruits")])
            .unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 7,
                prev_page: Some(4),
                next_page: None,
            }])
            .unwrap();

        mediator
            .load(LoadType::Refresh, &state_with(&store, Some(0)))
            .unwrap();

        assert_eq!(source.requests()[0].page, 5);
    }

    #[test]
    fn append_follows_next_key_of_last_item() {
        let (source, store, mediator) = setup(
            InMemorySource::new()
                .with_page("fruits", 1, photos(1..4))
                .with_page("fruits", 2, photos(4..7)),
        );
        mediator.load(LoadType::Refresh, &empty_state()).unwrap();

        let result = mediator
            .load(LoadType::Append, &state_with(&store, None))
            .unwrap();

        assert!(!result.end_of_pagination_reached);
        assert_eq!(source.requests()[1].page, 2);
        assert_eq!(store.count_photos("fruits").unwrap(), 6);

        let key = store.pagination_key(5).unwrap().unwrap();
        assert_eq!(key.prev_page, Some(1));
        assert_eq!(key.next_page, Some(3));
    }

    #[test]
    fn append_without_next_key_ends_without_fetching() {
        let (source, store, mediator) = setup(InMemorySource::new());
        store
            .insert_photos(&[CachedPhoto::new(sample_photo(1), "fruits")])
            .unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 1,
                prev_page: Some(1),
                next_page: None,
            }])
            .unwrap();

        let result = mediator
            .load(LoadType::Append, &state_with(&store, None))
            .unwrap();

        assert!(result.end_of_pagination_reached);
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn append_with_nothing_loaded_does_not_fetch() {
        let (source, _store, mediator) = setup(InMemorySource::new());

        let result = mediator.load(LoadType::Append, &empty_state()).unwrap();

        assert!(!result.end_of_pagination_reached);
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn prepend_on_first_page_ends_without_fetching() {
        let (source, store, mediator) =
            setup(InMemorySource::new().with_page("fruits", 1, photos(1..4)));
        mediator.load(LoadType::Refresh, &empty_state()).unwrap();

        let result = mediator
            .load(LoadType::Prepend, &state_with(&store, None))
            .unwrap();

        assert!(result.end_of_pagination_reached);
        assert_eq!(source.request_count(), 1);
    }

    #[test]
    fn prepend_writes_before_existing_rows() {
        let (source, store, mediator) = setup(
            InMemorySource::new()
                .with_page("fruits", 1, photos(1..4))
                .with_page("fruits", 2, photos(4..7)),
        );
        store
            .insert_photos(&[CachedPhoto::new(sample_photo(4), "fruits")])
            .unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 4,
                prev_page: Some(1),
                next_page: Some(3),
            }])
            .unwrap();

        mediator
            .load(LoadType::Prepend, &state_with(&store, None))
            .unwrap();

        assert_eq!(source.requests()[0].page, 1);
        let ids: Vec<u64> = store
            .query_photos("fruits", 0, 10)
            .unwrap()
            .iter()
            .map(CachedPhoto::id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_page_writes_no_next_key_and_ends() {
        let (_source, store, mediator) =
            setup(InMemorySource::new().with_page("fruits", 1, photos(1..4)));
        mediator.load(LoadType::Refresh, &empty_state()).unwrap();

        // Page 2 is not registered, so it comes back empty
        let result = mediator
            .load(LoadType::Append, &state_with(&store, None))
            .unwrap();

        assert!(result.end_of_pagination_reached);
        assert_eq!(store.count_photos("fruits").unwrap(), 3);
    }

    #[test]
    fn empty_refresh_clears_cache() {
        let (_source, store, mediator) = setup(InMemorySource::new());
        store
            .insert_photos(&[CachedPhoto::new(sample_photo(1), "fruits")])
            .unwrap();

        let result = mediator.load(LoadType::Refresh, &empty_state()).unwrap();

        assert!(result.end_of_pagination_reached);
        assert_eq!(store.stats().unwrap().total_photos, 0);
    }

    #[test]
    fn network_failure_surfaces_without_retry() {
        let (source, store, mediator) =
            setup(InMemorySource::new().with_page("fruits", 1, photos(1..4)));
        source.fail_next(RemoteError::Network {
            url: "memory".to_string(),
            reason: "offline".to_string(),
        });
        store
            .insert_photos(&[CachedPhoto::new(sample_photo(99), "fruits")])
            .unwrap();

        let error = mediator.load(LoadType::Refresh, &empty_state()).unwrap_err();

        assert_eq!(error.kind, LoadErrorKind::Network);
        assert_eq!(source.request_count(), 1);
        // Nothing was cleared
        assert!(store.photo(99).unwrap().is_some());
    }

    #[test]
    fn protocol_failure_is_unknown_error() {
        let (source, _store, mediator) = setup(InMemorySource::new());
        source.fail_next(RemoteError::Http {
            status: 400,
            url: "memory".to_string(),
        });

        let error = mediator.load(LoadType::Refresh, &empty_state()).unwrap_err();

        assert_eq!(error.kind, LoadErrorKind::Unknown);
    }
}
