//! Detail session: one photo from the cache.

use super::contract::{DetailState, ErrorEvent, OneShot, UNKNOWN_ERROR_DETAIL};
use crate::core::model::PhotoView;
use crate::core::usecase::DetailUseCase;
use crate::error::DetailError;
use crate::events::{Event, EventSender, NavigationEvent};

/// State holder for a photo detail screen
pub struct DetailSession {
    use_case: DetailUseCase,
    state: DetailState,
    events: EventSender,
}

impl DetailSession {
    pub fn new(use_case: DetailUseCase, events: EventSender) -> Self {
        Self {
            use_case,
            state: DetailState::default(),
            events,
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Look the photo up and publish it, or an error if it is not cached
    pub fn load(&mut self, id: u64) -> &DetailState {
        match self.use_case.photo(id) {
            Ok(photo) => {
                self.state.photo = Some(PhotoView::from(&photo));
                self.state.error = None;
            }
            Err(error) => {
                match &error {
                    DetailError::PhotoNotFound { .. } => {
                        tracing::info!(photo_id = id, "Photo not in cache")
                    }
                    DetailError::Lookup { reason, .. } => {
                        tracing::warn!(photo_id = id, reason = %reason, "Photo lookup failed")
                    }
                }
                self.state.photo = None;
                self.state.error = Some(OneShot::new(ErrorEvent::Unknown(
                    UNKNOWN_ERROR_DETAIL.to_string(),
                )));
            }
        }
        &self.state
    }

    /// Leave the detail view
    pub fn navigate_up(&self) {
        self.events.send(Event::Navigation(NavigationEvent::Up));
    }
}
