//! Live single-photo lookups.

use crate::core::cache::PhotoStore;
use crate::core::model::Photo;
use crate::error::CacheError;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A photo id watched in the cache
///
/// The first `next_timeout` call yields the current value. Later calls block
/// until a cache commit changes it. `None` inside the value means the photo
/// is not cached, which is a normal state and not an error.
pub struct PhotoWatch {
    id: u64,
    store: Arc<dyn PhotoStore>,
    changes: Receiver<()>,
    last: Option<Option<Photo>>,
}

impl PhotoWatch {
    pub fn new(id: u64, store: Arc<dyn PhotoStore>) -> Self {
        let changes = store.subscribe();
        Self {
            id,
            store,
            changes,
            last: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Read the cached value now
    pub fn current(&self) -> Result<Option<Photo>, CacheError> {
        Ok(self.store.photo(self.id)?.map(|cached| cached.into_domain()))
    }

    /// Next distinct value, or `Ok(None)` if nothing changed within `timeout`
    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<Option<Photo>>, CacheError> {
        if self.last.is_none() {
            let value = self.current()?;
            self.last = Some(value.clone());
            return Ok(Some(value));
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.changes.recv_timeout(remaining) {
                Ok(()) => {
                    let value = self.current()?;
                    if self.last.as_ref() != Some(&value) {
                        self.last = Some(value.clone());
                        return Ok(Some(value));
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::InMemoryPhotoStore;
    use crate::core::model::{sample_photo, CachedPhoto};
    use std::thread;

    #[test]
    fn first_value_is_immediate_even_when_absent() {
        let store: Arc<dyn PhotoStore> = Arc::new(InMemoryPhotoStore::new());
        let mut watch = PhotoWatch::new(1, store);

        let first = watch.next_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(first, Some(None));
    }

    #[test]
    fn emits_when_photo_arrives() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mut watch = PhotoWatch::new(1, store.clone());
        watch.next_timeout(Duration::ZERO).unwrap();

        let writer = thread::spawn(move || {
            store
                .insert_photos(&[CachedPhoto::new(sample_photo(1), "fruits")])
                .unwrap();
        });

        let value = watch.next_timeout(Duration::from_secs(5)).unwrap();
        writer.join().unwrap();

        assert_eq!(value.flatten().map(|photo| photo.id), Some(1));
    }

    #[test]
    fn unrelated_commits_do_not_emit() {
        let store = Arc::new(InMemoryPhotoStore::new());
        let mut watch = PhotoWatch::new(1, store.clone());
        watch.next_timeout(Duration::ZERO).unwrap();

        store
            .insert_photos(&[CachedPhoto::new(sample_photo(2), "fruits")])
            .unwrap();

        assert_eq!(watch.next_timeout(Duration::from_millis(50)).unwrap(), None);
    }
}
