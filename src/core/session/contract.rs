//! State and input types shared by the sessions.

use crate::core::model::PhotoView;
use crate::error::{LoadError, LoadErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const SEARCH_NOT_STARTED: &str = "Type something to start searching";
pub const NO_PHOTO_FOUND: &str = "No photos found";
pub const NETWORK_ERROR: &str = "Network error. Check your connection and retry.";
pub const UNKNOWN_ERROR: &str = "Something went wrong. Please retry.";
pub const UNKNOWN_ERROR_DETAIL: &str = "This photo is no longer available.";

/// A value meant to be acted on once, such as an error toast
///
/// Clones share the handled flag, so a state snapshot copied to several
/// places still only yields the value once.
#[derive(Debug, Clone)]
pub struct OneShot<T> {
    content: T,
    handled: Arc<AtomicBool>,
}

impl<T> OneShot<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            handled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The content, the first time this is called across all clones
    pub fn take(&self) -> Option<&T> {
        if self.handled.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(&self.content)
        }
    }

    /// The content, regardless of whether it was handled
    pub fn peek(&self) -> &T {
        &self.content
    }
}

/// User-facing error notices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorEvent {
    Network(String),
    Unknown(String),
}

impl ErrorEvent {
    pub fn message(&self) -> &str {
        match self {
            ErrorEvent::Network(message) | ErrorEvent::Unknown(message) => message,
        }
    }
}

impl From<&LoadError> for ErrorEvent {
    fn from(error: &LoadError) -> Self {
        match error.kind {
            LoadErrorKind::Network => ErrorEvent::Network(NETWORK_ERROR.to_string()),
            LoadErrorKind::Unknown => ErrorEvent::Unknown(UNKNOWN_ERROR.to_string()),
        }
    }
}

/// Everything a search screen renders
#[derive(Debug, Clone)]
pub struct SearchState {
    pub is_loading: bool,
    /// Raw query as typed
    pub query: String,
    /// Hint shown in place of results
    pub info_text: String,
    pub is_dialog_showing: bool,
    /// Loaded window of results
    pub photos: Vec<PhotoView>,
    /// Position of `photos[0]` among all cached results for the query
    pub first_position: usize,
    pub error: Option<OneShot<ErrorEvent>>,
}

impl SearchState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            query: query.into(),
            info_text: String::new(),
            is_dialog_showing: false,
            photos: Vec::new(),
            first_position: 0,
            error: None,
        }
    }
}

/// Input to a search session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    OnSearch(String),
    OnQueryClearClicked,
    OnPhotoClicked(u64),
    OnSelectConfirmed,
    OnSelectDecline,
    /// The consumer scrolled to the end of the results
    LoadMore,
    /// The consumer scrolled to the start of the loaded window
    LoadPrevious,
    /// The consumer is looking at this index of `SearchState::photos`
    OnScrolled(usize),
    /// The consumer asked to retry a failed load
    Retry,
}

/// Everything a detail screen renders
#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub photo: Option<PhotoView>,
    pub error: Option<OneShot<ErrorEvent>>,
}
