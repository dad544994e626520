//! Search session: debounced, latest-wins query dispatch.

use super::contract::{
    ErrorEvent, OneShot, SearchState, UiEvent, NO_PHOTO_FOUND, SEARCH_NOT_STARTED,
};
use crate::config::SearchConfig;
use crate::core::model::PhotoView;
use crate::core::paging::Pager;
use crate::core::usecase::SearchUseCase;
use crate::error::LoadError;
use crate::events::{Event, EventSender, NavigationEvent, SearchEvent};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Command {
    Query(String),
    LoadMore,
    LoadPrevious,
    Anchor(usize),
    Retry,
    Shutdown,
}

/// Shared between the session handle and its worker
struct Shared {
    state: Mutex<SearchState>,
    changed: Condvar,
    /// Bumped on every typed query; a result is published only if the
    /// generation it started under is still current
    generation: AtomicU64,
    selected: Mutex<Option<u64>>,
    events: EventSender,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut SearchState)) {
        let mut state = self.lock();
        f(&mut state);
        drop(state);
        self.changed.notify_all();
    }
}

/// A running search screen
///
/// Typed queries are debounced, repeated queries are ignored and an empty
/// query clears the results. Only the most recent query may publish results.
pub struct SearchSession {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SearchSession {
    /// Start the worker and dispatch `config.initial_query`
    pub fn start(use_case: SearchUseCase, config: &SearchConfig, events: EventSender) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(SearchState::new("")),
            changed: Condvar::new(),
            generation: AtomicU64::new(0),
            selected: Mutex::new(None),
            events,
        });
        let (commands, inbox) = unbounded();

        let worker = Worker {
            shared: shared.clone(),
            use_case,
            inbox,
            debounce: config.debounce,
            pending: None,
            last_settled: None,
            active: None,
            unpublished: false,
        };
        let handle = thread::Builder::new()
            .name("search-session".to_string())
            .spawn(move || worker.run())
            .ok();
        if handle.is_none() {
            tracing::error!("Failed to spawn search session worker");
        }

        let session = Self {
            shared,
            commands,
            worker: handle,
        };
        session.on_event(UiEvent::OnSearch(config.initial_query.clone()));
        session
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SearchState {
        self.shared.lock().clone()
    }

    /// Block until `predicate` holds or `timeout` passes
    ///
    /// Returns the matching state, or `None` on timeout.
    pub fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&SearchState) -> bool,
    ) -> Option<SearchState> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            if predicate(&state) {
                return Some(state.clone());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            state = match self.shared.changed.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn on_event(&self, event: UiEvent) {
        match event {
            UiEvent::OnSearch(query) => {
                self.shared.generation.fetch_add(1, Ordering::SeqCst);
                self.shared.update(|state| state.query = query.clone());
                self.send(Command::Query(query));
            }
            UiEvent::OnQueryClearClicked => {
                self.shared.generation.fetch_add(1, Ordering::SeqCst);
                self.shared.update(|state| {
                    state.query.clear();
                    state.photos.clear();
                });
                self.send(Command::Query(String::new()));
            }
            UiEvent::OnPhotoClicked(id) => {
                *self.selected() = Some(id);
                self.shared.update(|state| state.is_dialog_showing = true);
            }
            UiEvent::OnSelectConfirmed => {
                let selected = self.selected().take();
                self.shared.update(|state| state.is_dialog_showing = false);
                if let Some(photo_id) = selected {
                    self.shared
                        .events
                        .send(Event::Navigation(NavigationEvent::ToDetail { photo_id }));
                }
            }
            UiEvent::OnSelectDecline => {
                self.selected().take();
                self.shared.update(|state| state.is_dialog_showing = false);
            }
            UiEvent::LoadMore => self.send(Command::LoadMore),
            UiEvent::LoadPrevious => self.send(Command::LoadPrevious),
            UiEvent::OnScrolled(position) => self.send(Command::Anchor(position)),
            UiEvent::Retry => self.send(Command::Retry),
        }
    }

    fn selected(&self) -> MutexGuard<'_, Option<u64>> {
        self.shared
            .selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Search session worker has stopped");
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    use_case: SearchUseCase,
    inbox: Receiver<Command>,
    debounce: Duration,
    /// Query waiting out the debounce window, with its deadline
    pending: Option<(String, Instant)>,
    last_settled: Option<String>,
    /// Pager for the query on screen and the generation it belongs to
    active: Option<(u64, Pager)>,
    /// The active pager's last results were discarded as superseded
    unpublished: bool,
}

impl Worker {
    fn run(mut self) {
        loop {
            let received = match &self.pending {
                Some((_, deadline)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.inbox.recv_timeout(remaining)
                }
                None => self.inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Command::Query(query)) => {
                    self.pending = Some((query, Instant::now() + self.debounce));
                }
                Ok(Command::LoadMore) => self.load_more(),
                Ok(Command::LoadPrevious) => self.load_previous(),
                Ok(Command::Anchor(position)) => {
                    if let Some((_, pager)) = self.active.as_mut() {
                        pager.set_anchor(position);
                    }
                }
                Ok(Command::Retry) => self.load_active(Pager::retry),
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if let Some((query, _)) = self.pending.take() {
                        self.settle(query);
                    }
                }
            }
        }
        tracing::debug!("Search session worker stopped");
    }

    /// A query survived the debounce window
    fn settle(&mut self, query: String) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        if self.last_settled.as_deref() == Some(query.as_str()) {
            // Same query retyped: the pager on screen stays current, and
            // shows whatever it loaded while the retyped query was pending
            if let Some((_, pager)) = self.active.take() {
                if self.unpublished {
                    let result = match pager.load_states().first_error() {
                        Some(error) => Err(error.clone()),
                        None => Ok(()),
                    };
                    self.unpublished = !self.publish(generation, &pager, result);
                }
                self.active = Some((generation, pager));
            }
            return;
        }
        self.last_settled = Some(query.clone());

        if query.trim().is_empty() {
            self.active = None;
            self.unpublished = false;
            self.shared.update(|state| {
                state.is_loading = false;
                state.info_text = SEARCH_NOT_STARTED.to_string();
                state.photos.clear();
            });
            return;
        }

        tracing::info!(query = %query, generation, "Dispatching search");
        self.shared.events.send(Event::Search(SearchEvent::QueryDispatched {
            query: query.clone(),
            generation,
        }));
        self.shared.update(|state| state.is_loading = true);

        let mut pager = self.use_case.search(&query);
        let result = pager.refresh();
        self.unpublished = !self.publish(generation, &pager, result);
        self.active = Some((generation, pager));
    }

    fn load_more(&mut self) {
        if self.pending.is_none() {
            self.load_active(Pager::append);
        }
    }

    fn load_previous(&mut self) {
        if self.pending.is_none() {
            self.load_active(Pager::prepend);
        }
    }

    /// Run one load on the active pager and publish the outcome
    fn load_active(&mut self, load: impl FnOnce(&mut Pager) -> Result<(), LoadError>) {
        if let Some((generation, mut pager)) = self.active.take() {
            self.shared.update(|state| state.is_loading = true);
            let result = load(&mut pager);
            self.unpublished = !self.publish(generation, &pager, result);
            self.active = Some((generation, pager));
        }
    }

    /// Write results to the state unless a newer query has arrived
    ///
    /// Returns whether the results were published.
    fn publish(&self, generation: u64, pager: &Pager, result: Result<(), LoadError>) -> bool {
        let query = pager.query().to_string();
        if self.shared.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(query = %query, "Discarding superseded results");
            self.shared
                .events
                .send(Event::Search(SearchEvent::Superseded { query }));
            return false;
        }

        let photos: Vec<PhotoView> = pager.items().iter().map(PhotoView::from).collect();
        let photo_count = photos.len();
        let first_position = pager.offset();

        match result {
            Ok(()) => {
                self.shared.update(|state| {
                    state.is_loading = false;
                    state.info_text = if photos.is_empty() {
                        NO_PHOTO_FOUND.to_string()
                    } else {
                        String::new()
                    };
                    state.photos = photos;
                    state.first_position = first_position;
                });
                self.shared
                    .events
                    .send(Event::Search(SearchEvent::ResultsUpdated { query, photo_count }));
            }
            Err(error) => {
                tracing::warn!(query = %query, error = %error, "Search load failed");
                self.shared.update(|state| {
                    state.is_loading = false;
                    if !photos.is_empty() {
                        state.photos = photos;
                        state.first_position = first_position;
                    }
                    state.error = Some(OneShot::new(ErrorEvent::from(&error)));
                });
                self.shared
                    .events
                    .send(Event::Search(SearchEvent::Failed { query, error }));
            }
        }
        true
    }
}
