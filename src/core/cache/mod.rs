//! # Cache Module
//!
//! Local store for fetched photos and their pagination keys.
//!
//! ## Contents
//! - Photo records, keyed by photo id and tagged with the search term
//! - A side table of pagination keys, one per cached photo
//!
//! Writes go through `PhotoStore::transaction`, so a page of photos and its
//! keys land together. Every commit pings subscribers, which is how live
//! lookups learn that the cache changed.
//!
//! ## Backends
//! - `SqlitePhotoStore` - Persistent storage using SQLite
//! - `InMemoryPhotoStore` - For testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryPhotoStore;
pub use sqlite::SqlitePhotoStore;
pub use traits::{CacheWriter, PhotoStore};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::SystemTime;

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached photos
    pub total_photos: usize,
    /// Number of pagination keys
    pub total_keys: usize,
    /// Distinct search terms with cached photos
    pub search_terms: Vec<String>,
    /// Oldest entry timestamp
    pub oldest_entry: Option<SystemTime>,
    /// Newest entry timestamp
    pub newest_entry: Option<SystemTime>,
}

/// Fan-out of commit notifications to subscribers
///
/// Each subscriber gets a one-slot channel, so a slow reader sees at most
/// one pending "something changed" signal no matter how many commits
/// happened in between.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    subscribers: Mutex<Vec<Sender<()>>>,
}

impl ChangeNotifier {
    pub(crate) fn subscribe(&self) -> Receiver<()> {
        let (sender, receiver) = bounded(1);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }
        receiver
    }

    pub(crate) fn notify(&self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|sender| match sender.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => true,
                Err(TrySendError::Disconnected(())) => false,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_coalesces_pending_signals() {
        let notifier = ChangeNotifier::default();
        let receiver = notifier.subscribe();

        notifier.notify();
        notifier.notify();
        notifier.notify();

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn notifier_forgets_dropped_subscribers() {
        let notifier = ChangeNotifier::default();
        let receiver = notifier.subscribe();
        drop(receiver);

        notifier.notify();

        assert!(notifier.subscribers.lock().unwrap().is_empty());
    }
}
