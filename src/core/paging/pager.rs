//! Pager: a window over one query's cached photos.

use super::{InitializeAction, LoadState, LoadStates, LoadType, Page, PagingConfig, PagingState, RemoteMediator};
use crate::core::cache::PhotoStore;
use crate::core::model::{CachedPhoto, Photo};
use crate::error::LoadError;
use crate::events::{null_sender, Event, EventSender, PagingEvent};
use std::collections::VecDeque;
use std::sync::Arc;

/// A loaded window over the cached results for one query
///
/// Loads take `&mut self`, so there is never more than one load in flight
/// for a pager, let alone per direction.
pub struct Pager {
    query: String,
    store: Arc<dyn PhotoStore>,
    mediator: Arc<dyn RemoteMediator>,
    config: PagingConfig,
    pages: VecDeque<Page>,
    anchor_position: Option<usize>,
    load_states: LoadStates,
    initialized: bool,
    events: EventSender,
}

impl Pager {
    pub fn new(
        query: impl Into<String>,
        store: Arc<dyn PhotoStore>,
        mediator: Arc<dyn RemoteMediator>,
        config: PagingConfig,
    ) -> Self {
        Self {
            query: query.into(),
            store,
            mediator,
            config,
            pages: VecDeque::new(),
            anchor_position: None,
            load_states: LoadStates::default(),
            initialized: false,
            events: null_sender(),
        }
    }

    /// Report load progress through `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn config(&self) -> PagingConfig {
        self.config
    }

    pub fn load_states(&self) -> &LoadStates {
        &self.load_states
    }

    /// Domain photos currently loaded, in order
    pub fn items(&self) -> Vec<Photo> {
        self.pages
            .iter()
            .flat_map(|page| page.items.iter())
            .map(|cached| cached.photo.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the first loaded item among all cached rows for the query
    pub fn offset(&self) -> usize {
        self.first_offset()
    }

    pub fn anchor_position(&self) -> Option<usize> {
        self.anchor_position
    }

    /// Record the last position the consumer looked at
    pub fn set_anchor(&mut self, position: usize) {
        let len = self.len();
        self.anchor_position = if len == 0 {
            None
        } else {
            Some(position.min(len - 1))
        };
    }

    /// Snapshot for the mediator
    pub fn state(&self) -> PagingState {
        PagingState {
            pages: self.pages.iter().cloned().collect(),
            anchor_position: self.anchor_position,
            config: self.config,
        }
    }

    /// Refetch around the anchor, then reread the window from the cache
    ///
    /// The cache is reread even when the remote load fails, so whatever is
    /// cached stays visible next to the error.
    pub fn refresh(&mut self) -> Result<(), LoadError> {
        self.begin(LoadType::Refresh);

        let remote = if !self.initialized
            && self.mediator.initialize() == InitializeAction::SkipInitialRefresh
        {
            None
        } else {
            Some(self.mediator.load(LoadType::Refresh, &self.state()))
        };
        self.initialized = true;

        let reloaded = self.reload_local();
        self.load_states.prepend = LoadState::incomplete();
        self.load_states.append = LoadState::incomplete();

        match (remote, reloaded) {
            (_, Err(error)) | (Some(Err(error)), Ok(_)) => self.fail(LoadType::Refresh, error),
            (Some(Ok(success)), Ok(loaded)) => {
                if success.end_of_pagination_reached {
                    self.load_states.append = LoadState::complete();
                }
                self.complete(LoadType::Refresh, loaded, success.end_of_pagination_reached)
            }
            (None, Ok(loaded)) => self.complete(LoadType::Refresh, loaded, false),
        }
    }

    /// Extend the window forwards
    pub fn append(&mut self) -> Result<(), LoadError> {
        if self.load_states.append.is_end_of_pagination() {
            return Ok(());
        }
        self.begin(LoadType::Append);

        let end = self.pages.back().map(Page::end).unwrap_or(0);
        match self.read_window(end, self.config.page_size) {
            Ok(items) if !items.is_empty() => {
                let loaded = self.push_back(end, items);
                return self.complete(LoadType::Append, loaded, false);
            }
            Ok(_) => {}
            Err(error) => return self.fail(LoadType::Append, error),
        }

        match self.mediator.load(LoadType::Append, &self.state()) {
            Err(error) => self.fail(LoadType::Append, error),
            Ok(success) if success.end_of_pagination_reached => {
                self.complete(LoadType::Append, 0, true)
            }
            Ok(_) => match self.read_window(end, self.config.page_size) {
                Ok(items) => {
                    let loaded = self.push_back(end, items);
                    self.complete(LoadType::Append, loaded, false)
                }
                Err(error) => self.fail(LoadType::Append, error),
            },
        }
    }

    /// Extend the window backwards
    pub fn prepend(&mut self) -> Result<(), LoadError> {
        if self.load_states.prepend.is_end_of_pagination() {
            return Ok(());
        }
        self.begin(LoadType::Prepend);

        if self.first_offset() > 0 {
            return match self.read_before_window() {
                Ok(loaded) => self.complete(LoadType::Prepend, loaded, false),
                Err(error) => self.fail(LoadType::Prepend, error),
            };
        }

        let before = match self.store.count_photos(&self.query) {
            Ok(count) => count,
            Err(error) => return self.fail(LoadType::Prepend, error.into()),
        };

        match self.mediator.load(LoadType::Prepend, &self.state()) {
            Err(error) => self.fail(LoadType::Prepend, error),
            Ok(success) if success.end_of_pagination_reached => {
                self.complete(LoadType::Prepend, 0, true)
            }
            Ok(_) => {
                let inserted = match self.store.count_photos(&self.query) {
                    Ok(after) => after.saturating_sub(before),
                    Err(error) => return self.fail(LoadType::Prepend, error.into()),
                };
                // Prepended rows sort first, pushing every loaded row back
                for page in self.pages.iter_mut() {
                    page.offset += inserted;
                }
                match self.read_before_window() {
                    Ok(loaded) => self.complete(LoadType::Prepend, loaded, false),
                    Err(error) => self.fail(LoadType::Prepend, error),
                }
            }
        }
    }

    /// Repeat whichever load last failed, refresh first
    pub fn retry(&mut self) -> Result<(), LoadError> {
        if self.load_states.refresh.error().is_some() {
            return self.refresh();
        }
        if self.load_states.append.error().is_some() {
            return self.append();
        }
        if self.load_states.prepend.error().is_some() {
            return self.prepend();
        }
        Ok(())
    }

    fn first_offset(&self) -> usize {
        self.pages.front().map(|page| page.offset).unwrap_or(0)
    }

    fn absolute_anchor(&self) -> Option<usize> {
        self.anchor_position
            .map(|anchor| self.first_offset() + anchor)
    }

    fn read_window(&self, offset: usize, limit: usize) -> Result<Vec<CachedPhoto>, LoadError> {
        Ok(self.store.query_photos(&self.query, offset, limit)?)
    }

    /// Replace the window with one centred on the anchor
    fn reload_local(&mut self) -> Result<usize, LoadError> {
        let total = self.store.count_photos(&self.query)?;
        let absolute_anchor = self.absolute_anchor();

        let mut offset = absolute_anchor
            .map(|anchor| anchor.saturating_sub(self.config.page_size / 2))
            .unwrap_or(0);
        if offset >= total {
            offset = 0;
        }

        let items = self.read_window(offset, self.config.initial_load_size)?;
        let loaded = items.len();

        self.pages.clear();
        self.pages.push_back(Page { offset, items });
        self.anchor_position = match absolute_anchor {
            Some(anchor) if loaded > 0 => Some(anchor.saturating_sub(offset).min(loaded - 1)),
            _ => None,
        };

        Ok(loaded)
    }

    /// Read up to a page of cached rows directly before the window
    fn read_before_window(&mut self) -> Result<usize, LoadError> {
        let start = self.first_offset();
        let from = start.saturating_sub(self.config.page_size);
        let items = self.read_window(from, start - from)?;
        Ok(self.push_front(from, items))
    }

    fn push_back(&mut self, offset: usize, items: Vec<CachedPhoto>) -> usize {
        let loaded = items.len();
        if loaded == 0 {
            return 0;
        }
        self.pages.push_back(Page { offset, items });

        let mut dropped = 0;
        while self.len() > self.config.max_size && self.pages.len() > 1 {
            if let Some(page) = self.pages.pop_front() {
                dropped += page.items.len();
            }
        }
        if dropped > 0 {
            self.anchor_position = self
                .anchor_position
                .map(|anchor| anchor.saturating_sub(dropped));
            self.report_dropped(dropped);
        }

        loaded
    }

    fn push_front(&mut self, offset: usize, items: Vec<CachedPhoto>) -> usize {
        let loaded = items.len();
        if loaded == 0 {
            return 0;
        }
        self.pages.push_front(Page { offset, items });
        self.anchor_position = self.anchor_position.map(|anchor| anchor + loaded);

        let mut dropped = 0;
        while self.len() > self.config.max_size && self.pages.len() > 1 {
            if let Some(page) = self.pages.pop_back() {
                dropped += page.items.len();
            }
        }
        if dropped > 0 {
            let len = self.len();
            self.anchor_position = self
                .anchor_position
                .map(|anchor| anchor.min(len.saturating_sub(1)));
            self.report_dropped(dropped);
        }

        loaded
    }

    fn report_dropped(&self, items_dropped: usize) {
        tracing::debug!(query = %self.query, items_dropped, "dropped pages outside window");
        self.events.send(Event::Paging(PagingEvent::PagesDropped {
            query: self.query.clone(),
            items_dropped,
        }));
    }

    fn begin(&mut self, load_type: LoadType) {
        self.load_states.set(load_type, LoadState::Loading);
        self.events.send(Event::Paging(PagingEvent::LoadStarted {
            query: self.query.clone(),
            load_type,
        }));
    }

    fn complete(
        &mut self,
        load_type: LoadType,
        items_loaded: usize,
        end_of_pagination_reached: bool,
    ) -> Result<(), LoadError> {
        tracing::debug!(
            query = %self.query,
            %load_type,
            items_loaded,
            end_of_pagination_reached,
            "load complete"
        );
        self.load_states.set(
            load_type,
            LoadState::NotLoading {
                end_of_pagination_reached,
            },
        );
        self.events.send(Event::Paging(PagingEvent::LoadCompleted {
            query: self.query.clone(),
            load_type,
            items_loaded,
            end_of_pagination_reached,
        }));
        Ok(())
    }

    fn fail(&mut self, load_type: LoadType, error: LoadError) -> Result<(), LoadError> {
        tracing::warn!(query = %self.query, %load_type, %error, "load failed");
        self.load_states
            .set(load_type, LoadState::Error(error.clone()));
        self.events.send(Event::Paging(PagingEvent::LoadFailed {
            query: self.query.clone(),
            load_type,
            error: error.clone(),
        }));
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::InMemoryPhotoStore;
    use crate::core::model::sample_photo;
    use crate::core::paging::{MediatorResult, MediatorSuccess};
    use std::sync::Mutex;

    /// Mediator that writes a fixed number of photos per remote page
    struct FakeMediator {
        store: Arc<InMemoryPhotoStore>,
        query: String,
        page_size: u64,
        last_page: u32,
        next_page: Mutex<u32>,
        failures: Mutex<Vec<LoadError>>,
        calls: Mutex<Vec<LoadType>>,
        initialize: InitializeAction,
    }

    impl FakeMediator {
        fn new(store: Arc<InMemoryPhotoStore>, page_size: u64, last_page: u32) -> Self {
            Self {
                store,
                query: "fruits".to_string(),
                page_size,
                last_page,
                next_page: Mutex::new(1),
                failures: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                initialize: InitializeAction::LaunchInitialRefresh,
            }
        }

        fn calls(&self) -> Vec<LoadType> {
            self.calls.lock().unwrap().clone()
        }

        fn write_page(&self, page: u32, clear: bool) {
            let photos: Vec<CachedPhoto> = (0..self.page_size)
                .map(|i| {
                    CachedPhoto::new(
                        sample_photo(page as u64 * 1000 + i),
                        self.query.clone(),
                    )
                })
                .collect();
            self.store
                .transaction(&mut |writer| {
                    if clear {
                        writer.delete_all_photos()?;
                    }
                    writer.insert_photos(&photos)
                })
                .unwrap();
        }
    }

    impl RemoteMediator for FakeMediator {
        fn initialize(&self) -> InitializeAction {
            self.initialize
        }

        fn load(&self, load_type: LoadType, _state: &PagingState) -> MediatorResult {
            self.calls.lock().unwrap().push(load_type);
            if let Some(error) = self.failures.lock().unwrap().pop() {
                return Err(error);
            }

            let mut next_page = self.next_page.lock().unwrap();
            let page = match load_type {
                LoadType::Refresh => 1,
                LoadType::Prepend => {
                    return Ok(MediatorSuccess {
                        end_of_pagination_reached: true,
                    })
                }
                LoadType::Append => *next_page,
            };
            if page > self.last_page {
                return Ok(MediatorSuccess {
                    end_of_pagination_reached: true,
                });
            }

            self.write_page(page, load_type == LoadType::Refresh);
            *next_page = page + 1;
            Ok(MediatorSuccess {
                end_of_pagination_reached: false,
            })
        }
    }

    fn pager(mediator: Arc<FakeMediator>, page_size: usize) -> Pager {
        let store: Arc<dyn PhotoStore> = mediator.store.clone();
        Pager::new("fruits", store, mediator, PagingConfig::new(page_size))
    }

    #[test]
    fn refresh_loads_first_remote_page() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 4, 5));
        let mut pager = pager(mediator.clone(), 4);

        pager.refresh().unwrap();

        assert_eq!(pager.len(), 4);
        assert_eq!(pager.items()[0].id, 1000);
        assert_eq!(mediator.calls(), vec![LoadType::Refresh]);
        assert_eq!(pager.load_states().refresh, LoadState::incomplete());
    }

    #[test]
    fn append_reads_cache_before_asking_mediator() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mut mediator = FakeMediator::new(store.clone(), 4, 5);
        mediator.initialize = InitializeAction::SkipInitialRefresh;
        // Two pages already cached from an earlier session
        mediator.write_page(1, false);
        mediator.write_page(2, false);
        *mediator.next_page.lock().unwrap() = 3;
        let mediator = Arc::new(mediator);

        let mut pager = Pager::new(
            "fruits",
            store,
            mediator.clone(),
            PagingConfig {
                page_size: 4,
                max_size: 12,
                initial_load_size: 4,
            },
        );
        pager.refresh().unwrap();
        pager.append().unwrap();

        assert!(mediator.calls().is_empty());
        assert_eq!(pager.len(), 8);

        // The cache is exhausted, so the next append goes remote
        pager.append().unwrap();
        assert_eq!(mediator.calls(), vec![LoadType::Append]);
        assert_eq!(pager.len(), 12);
    }

    #[test]
    fn append_stops_at_end_of_pagination() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 3, 2));
        let mut pager = pager(mediator.clone(), 3);

        pager.refresh().unwrap();
        pager.append().unwrap();
        pager.append().unwrap();
        assert!(pager.load_states().append.is_end_of_pagination());

        let calls = mediator.calls().len();
        pager.append().unwrap();
        assert_eq!(mediator.calls().len(), calls);
        assert_eq!(pager.len(), 6);
    }

    #[test]
    fn window_drops_far_pages_beyond_max_size() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 2, 10));
        let mut pager = pager(mediator, 2);

        pager.refresh().unwrap();
        pager.set_anchor(1);
        for _ in 0..4 {
            pager.append().unwrap();
        }

        assert!(pager.len() <= 6);
        // The newest page is always kept
        assert_eq!(pager.items().last().unwrap().id, 5001);
    }

    #[test]
    fn failed_append_is_retried_on_demand() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 2, 3));
        let mut pager = pager(mediator.clone(), 2);
        pager.refresh().unwrap();

        mediator
            .failures
            .lock()
            .unwrap()
            .push(LoadError::network("offline"));
        let error = pager.append().unwrap_err();
        assert!(error.is_network());
        assert!(pager.load_states().append.error().is_some());

        pager.retry().unwrap();
        assert_eq!(pager.len(), 4);
        assert!(pager.load_states().first_error().is_none());
    }

    #[test]
    fn failed_refresh_still_shows_cached_rows() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 2, 3));
        mediator.write_page(1, false);
        mediator
            .failures
            .lock()
            .unwrap()
            .push(LoadError::unknown("500"));
        let mut pager = pager(mediator, 2);

        assert!(pager.refresh().is_err());
        assert_eq!(pager.len(), 2);
        assert!(pager.load_states().refresh.error().is_some());
    }

    #[test]
    fn skip_initial_refresh_reads_cache_only() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mut mediator = FakeMediator::new(store, 2, 3);
        mediator.initialize = InitializeAction::SkipInitialRefresh;
        mediator.write_page(1, false);
        let mediator = Arc::new(mediator);
        let mut pager = pager(mediator.clone(), 2);

        pager.refresh().unwrap();
        assert!(mediator.calls().is_empty());
        assert_eq!(pager.len(), 2);

        // Later refreshes go to the network
        pager.refresh().unwrap();
        assert_eq!(mediator.calls(), vec![LoadType::Refresh]);
    }

    #[test]
    fn prepend_at_first_page_reaches_end() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 2, 3));
        let mut pager = pager(mediator, 2);
        pager.refresh().unwrap();

        pager.prepend().unwrap();

        assert!(pager.load_states().prepend.is_end_of_pagination());
        assert_eq!(pager.len(), 2);
    }

    #[test]
    fn set_anchor_clamps_to_loaded_items() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mediator = Arc::new(FakeMediator::new(store, 2, 3));
        let mut pager = pager(mediator, 2);

        pager.set_anchor(5);
        assert_eq!(pager.anchor_position(), None);

        pager.refresh().unwrap();
        pager.set_anchor(5);
        assert_eq!(pager.anchor_position(), Some(1));
    }
}
