//! Cache backend trait definitions.

use super::CacheStats;
use crate::core::model::{CachedPhoto, PaginationKey};
use crate::error::CacheError;
use crossbeam_channel::Receiver;

/// Write access inside a cache transaction
///
/// Everything written through one `CacheWriter` becomes visible together
/// when the transaction closure returns `Ok`, or not at all.
pub trait CacheWriter {
    /// Upsert photos. Positions are assigned in slice order, after every
    /// photo already cached.
    fn insert_photos(&mut self, photos: &[CachedPhoto]) -> Result<(), CacheError>;

    /// Upsert photos so they sort, in slice order, before every photo
    /// already cached
    fn insert_photos_before(&mut self, photos: &[CachedPhoto]) -> Result<(), CacheError>;

    /// Upsert pagination keys, replacing any key for the same photo
    fn insert_keys(&mut self, keys: &[PaginationKey]) -> Result<(), CacheError>;

    /// Delete every cached photo
    fn delete_all_photos(&mut self) -> Result<(), CacheError>;

    /// Delete every pagination key
    fn delete_all_keys(&mut self) -> Result<(), CacheError>;
}

/// Trait for photo cache backends
pub trait PhotoStore: Send + Sync {
    /// Photos cached for a search term, in insertion order
    fn query_photos(
        &self,
        search_term: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CachedPhoto>, CacheError>;

    /// Number of photos cached for a search term
    fn count_photos(&self, search_term: &str) -> Result<usize, CacheError>;

    /// Point lookup. A miss is `Ok(None)`.
    fn photo(&self, id: u64) -> Result<Option<CachedPhoto>, CacheError>;

    /// Pagination key for a cached photo
    fn pagination_key(&self, photo_id: u64) -> Result<Option<PaginationKey>, CacheError>;

    /// Run `work` inside a single atomic transaction
    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn CacheWriter) -> Result<(), CacheError>,
    ) -> Result<(), CacheError>;

    /// Subscribe to commit notifications. One `()` is sent per committed
    /// transaction; dropped receivers are forgotten.
    fn subscribe(&self) -> Receiver<()>;

    /// Get cache statistics
    fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Upsert photos in their own transaction
    fn insert_photos(&self, photos: &[CachedPhoto]) -> Result<(), CacheError> {
        self.transaction(&mut |writer| writer.insert_photos(photos))
    }

    /// Upsert pagination keys in their own transaction
    fn insert_keys(&self, keys: &[PaginationKey]) -> Result<(), CacheError> {
        self.transaction(&mut |writer| writer.insert_keys(keys))
    }

    /// Clear photos and keys together
    fn clear(&self) -> Result<(), CacheError> {
        self.transaction(&mut |writer| {
            writer.delete_all_keys()?;
            writer.delete_all_photos()
        })
    }
}
