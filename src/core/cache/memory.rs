//! In-memory cache backend for testing.

use super::{CacheStats, CacheWriter, ChangeNotifier, PhotoStore};
use crate::core::model::{CachedPhoto, PaginationKey};
use crate::error::CacheError;
use crossbeam_channel::Receiver;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct Tables {
    photos: HashMap<u64, CachedPhoto>,
    keys: HashMap<u64, PaginationKey>,
    first_position: i64,
    last_position: i64,
}

impl Tables {
    /// Position of an existing row for the same photo and term
    fn kept_position(&self, photo: &CachedPhoto) -> Option<i64> {
        self.photos
            .get(&photo.id())
            .filter(|existing| existing.search_term == photo.search_term)
            .map(|existing| existing.position)
    }
}

impl CacheWriter for Tables {
    fn insert_photos(&mut self, photos: &[CachedPhoto]) -> Result<(), CacheError> {
        for photo in photos {
            let mut photo = photo.clone();
            photo.position = match self.kept_position(&photo) {
                Some(position) => position,
                None => {
                    self.last_position += 1;
                    self.last_position
                }
            };
            self.photos.insert(photo.id(), photo);
        }
        Ok(())
    }

    fn insert_photos_before(&mut self, photos: &[CachedPhoto]) -> Result<(), CacheError> {
        let count = photos.len() as i64;
        let start = self.first_position - count;
        for (index, photo) in photos.iter().enumerate() {
            let mut photo = photo.clone();
            photo.position = self
                .kept_position(&photo)
                .unwrap_or(start + index as i64);
            self.photos.insert(photo.id(), photo);
        }
        self.first_position = start;
        Ok(())
    }

    fn insert_keys(&mut self, keys: &[PaginationKey]) -> Result<(), CacheError> {
        for key in keys {
            self.keys.insert(key.photo_id, *key);
        }
        Ok(())
    }

    fn delete_all_photos(&mut self) -> Result<(), CacheError> {
        self.photos.clear();
        self.first_position = 0;
        self.last_position = 0;
        Ok(())
    }

    fn delete_all_keys(&mut self) -> Result<(), CacheError> {
        self.keys.clear();
        Ok(())
    }
}

/// In-memory photo store
///
/// Transactions run against a copy of the tables and swap it in on
/// success, so a failed transaction leaves nothing behind.
#[derive(Default)]
pub struct InMemoryPhotoStore {
    tables: RwLock<Tables>,
    notifier: ChangeNotifier,
}

impl InMemoryPhotoStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CacheError {
        CacheError::Corrupted {
            path: PathBuf::from("memory"),
        }
    }

    fn sorted_for(tables: &Tables, search_term: &str) -> Vec<CachedPhoto> {
        let mut photos: Vec<CachedPhoto> = tables
            .photos
            .values()
            .filter(|photo| photo.search_term == search_term)
            .cloned()
            .collect();
        photos.sort_by_key(|photo| photo.position);
        photos
    }
}

impl PhotoStore for InMemoryPhotoStore {
    fn query_photos(
        &self,
        search_term: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CachedPhoto>, CacheError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(Self::sorted_for(&tables, search_term)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn count_photos(&self, search_term: &str) -> Result<usize, CacheError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .photos
            .values()
            .filter(|photo| photo.search_term == search_term)
            .count())
    }

    fn photo(&self, id: u64) -> Result<Option<CachedPhoto>, CacheError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.photos.get(&id).cloned())
    }

    fn pagination_key(&self, photo_id: u64) -> Result<Option<PaginationKey>, CacheError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.keys.get(&photo_id).copied())
    }

    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn CacheWriter) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        {
            let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
            let mut staged = tables.clone();
            work(&mut staged)?;
            *tables = staged;
        }
        self.notifier.notify();
        Ok(())
    }

    fn subscribe(&self) -> Receiver<()> {
        self.notifier.subscribe()
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;

        let search_terms: BTreeSet<String> = tables
            .photos
            .values()
            .map(|photo| photo.search_term.clone())
            .collect();

        Ok(CacheStats {
            total_photos: tables.photos.len(),
            total_keys: tables.keys.len(),
            search_terms: search_terms.into_iter().collect(),
            oldest_entry: tables.photos.values().map(|p| p.cached_at).min(),
            newest_entry: tables.photos.values().map(|p| p.cached_at).max(),
        })
    }
}
