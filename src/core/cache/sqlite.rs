//! SQLite cache backend for persistent storage.

use super::{CacheStats, CacheWriter, ChangeNotifier, PhotoStore};
use crate::core::model::{CachedPhoto, PaginationKey, Photo};
use crate::error::CacheError;
use crossbeam_channel::Receiver;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const PHOTO_COLUMNS: &str = "id, user, tags, preview_url, web_format_url, large_image_url,
     likes, comments, downloads, search_term, position, cached_at";

/// SQLite-backed persistent photo cache
///
/// Uses WAL (Write-Ahead Logging) mode so readers are not blocked while a
/// page is being written.
pub struct SqlitePhotoStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    notifier: ChangeNotifier,
}

impl SqlitePhotoStore {
    /// Open or create a cache database at the given path
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::create_schema(&conn)?;

        tracing::debug!(path = %path.display(), "opened photo cache");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            notifier: ChangeNotifier::default(),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;
        Self::create_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
            notifier: ChangeNotifier::default(),
        })
    }

    fn create_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                id INTEGER PRIMARY KEY,
                user TEXT NOT NULL,
                tags TEXT NOT NULL,
                preview_url TEXT NOT NULL,
                web_format_url TEXT NOT NULL,
                large_image_url TEXT NOT NULL,
                likes INTEGER NOT NULL,
                comments INTEGER NOT NULL,
                downloads INTEGER NOT NULL,
                search_term TEXT NOT NULL,
                position INTEGER NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_term ON photos(search_term, position)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS photo_pagination_keys (
                photo_id INTEGER PRIMARY KEY,
                prev_page INTEGER,
                next_page INTEGER
            )",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    /// Convert SystemTime to Unix timestamp
    fn to_timestamp(time: SystemTime) -> i64 {
        time.duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs() as i64
    }

    /// Convert Unix timestamp to SystemTime
    fn from_timestamp(timestamp: i64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64)
    }

    fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<CachedPhoto> {
        Ok(CachedPhoto {
            photo: Photo {
                id: row.get::<_, i64>(0)? as u64,
                user: row.get(1)?,
                tags: row.get(2)?,
                preview_url: row.get(3)?,
                web_format_url: row.get(4)?,
                large_image_url: row.get(5)?,
                likes: row.get::<_, i64>(6)? as u64,
                comments: row.get::<_, i64>(7)? as u64,
                downloads: row.get::<_, i64>(8)? as u64,
            },
            search_term: row.get(9)?,
            position: row.get(10)?,
            cached_at: Self::from_timestamp(row.get(11)?),
        })
    }
}

/// Writer bound to an open SQLite transaction
struct SqliteWriter<'a> {
    conn: &'a Connection,
}

impl SqliteWriter<'_> {
    /// Write photos at consecutive positions starting at `first_position`
    ///
    /// A photo already cached for the same term keeps its position, so a
    /// photo repeated on a later remote page does not shift the rows after it.
    fn write_photos(&self, photos: &[CachedPhoto], first_position: i64) -> Result<(), CacheError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO photos
             (id, user, tags, preview_url, web_format_url, large_image_url,
              likes, comments, downloads, search_term, position, cached_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                user = excluded.user,
                tags = excluded.tags,
                preview_url = excluded.preview_url,
                web_format_url = excluded.web_format_url,
                large_image_url = excluded.large_image_url,
                likes = excluded.likes,
                comments = excluded.comments,
                downloads = excluded.downloads,
                position = CASE WHEN photos.search_term = excluded.search_term
                                THEN photos.position ELSE excluded.position END,
                search_term = excluded.search_term,
                cached_at = excluded.cached_at",
        )?;

        for (index, cached) in photos.iter().enumerate() {
            let photo = &cached.photo;
            stmt.execute(params![
                photo.id as i64,
                photo.user,
                photo.tags,
                photo.preview_url,
                photo.web_format_url,
                photo.large_image_url,
                photo.likes as i64,
                photo.comments as i64,
                photo.downloads as i64,
                cached.search_term,
                first_position + index as i64,
                SqlitePhotoStore::to_timestamp(cached.cached_at),
            ])?;
        }

        Ok(())
    }
}

impl CacheWriter for SqliteWriter<'_> {
    fn insert_photos(&mut self, photos: &[CachedPhoto]) -> Result<(), CacheError> {
        let last: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), 0) FROM photos",
            [],
            |row| row.get(0),
        )?;
        self.write_photos(photos, last + 1)
    }

    fn insert_photos_before(&mut self, photos: &[CachedPhoto]) -> Result<(), CacheError> {
        let first: i64 = self.conn.query_row(
            "SELECT COALESCE(MIN(position), 0) FROM photos",
            [],
            |row| row.get(0),
        )?;
        self.write_photos(photos, first - photos.len() as i64)
    }

    fn insert_keys(&mut self, keys: &[PaginationKey]) -> Result<(), CacheError> {
        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO photo_pagination_keys (photo_id, prev_page, next_page)
             VALUES (?, ?, ?)",
        )?;

        for key in keys {
            stmt.execute(params![key.photo_id as i64, key.prev_page, key.next_page])?;
        }

        Ok(())
    }

    fn delete_all_photos(&mut self) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM photos", [])?;
        Ok(())
    }

    fn delete_all_keys(&mut self) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM photo_pagination_keys", [])?;
        Ok(())
    }
}

impl PhotoStore for SqlitePhotoStore {
    fn query_photos(
        &self,
        search_term: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CachedPhoto>, CacheError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM photos WHERE search_term = ?
             ORDER BY position ASC LIMIT ? OFFSET ?",
            PHOTO_COLUMNS
        ))?;

        let photos = stmt
            .query_map(
                params![search_term, limit as i64, offset as i64],
                Self::photo_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(photos)
    }

    fn count_photos(&self, search_term: &str) -> Result<usize, CacheError> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE search_term = ?",
            [search_term],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn photo(&self, id: u64) -> Result<Option<CachedPhoto>, CacheError> {
        let conn = self.lock()?;

        let photo = conn
            .query_row(
                &format!("SELECT {} FROM photos WHERE id = ?", PHOTO_COLUMNS),
                [id as i64],
                Self::photo_from_row,
            )
            .optional()?;

        Ok(photo)
    }

    fn pagination_key(&self, photo_id: u64) -> Result<Option<PaginationKey>, CacheError> {
        let conn = self.lock()?;

        let key = conn
            .query_row(
                "SELECT prev_page, next_page FROM photo_pagination_keys WHERE photo_id = ?",
                [photo_id as i64],
                |row| {
                    Ok(PaginationKey {
                        photo_id,
                        prev_page: row.get(0)?,
                        next_page: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(key)
    }

    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn CacheWriter) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;

            // Dropping `tx` on the error path rolls everything back
            work(&mut SqliteWriter { conn: &tx })?;

            tx.commit()
                .map_err(|e| CacheError::TransactionFailed(e.to_string()))?;
        }

        self.notifier.notify();
        Ok(())
    }

    fn subscribe(&self) -> Receiver<()> {
        self.notifier.subscribe()
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.lock()?;

        let total_photos: i64 =
            conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;

        let total_keys: i64 = conn.query_row(
            "SELECT COUNT(*) FROM photo_pagination_keys",
            [],
            |row| row.get(0),
        )?;

        let mut stmt =
            conn.prepare("SELECT DISTINCT search_term FROM photos ORDER BY search_term")?;
        let search_terms = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let (oldest, newest): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(cached_at), MAX(cached_at) FROM photos",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            total_photos: total_photos as usize,
            total_keys: total_keys as usize,
            search_terms,
            oldest_entry: oldest.map(Self::from_timestamp),
            newest_entry: newest.map(Self::from_timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::sample_photo;
    use tempfile::TempDir;

    fn cached(id: u64, term: &str) -> CachedPhoto {
        CachedPhoto::new(sample_photo(id), term)
    }

    #[test]
    fn sqlite_store_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("photos.db");

        let store = SqlitePhotoStore::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.stats().unwrap().total_photos, 0);
    }

    #[test]
    fn sqlite_store_reads_in_insertion_order() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();

        store
            .insert_photos(&[cached(30, "fruits"), cached(10, "fruits"), cached(20, "fruits")])
            .unwrap();
        store.insert_photos(&[cached(5, "cats")]).unwrap();

        let ids: Vec<u64> = store
            .query_photos("fruits", 0, 10)
            .unwrap()
            .iter()
            .map(CachedPhoto::id)
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);

        let window: Vec<u64> = store
            .query_photos("fruits", 1, 1)
            .unwrap()
            .iter()
            .map(CachedPhoto::id)
            .collect();
        assert_eq!(window, vec![10]);

        assert_eq!(store.count_photos("cats").unwrap(), 1);
    }

    #[test]
    fn sqlite_store_point_lookup_miss_is_none() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();
        store.insert_photos(&[cached(1, "fruits")]).unwrap();

        assert_eq!(store.photo(1).unwrap().unwrap().photo, sample_photo(1));
        assert!(store.photo(2).unwrap().is_none());
    }

    #[test]
    fn sqlite_store_replaces_keys() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();

        store
            .insert_keys(&[PaginationKey {
                photo_id: 1,
                prev_page: None,
                next_page: Some(2),
            }])
            .unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 1,
                prev_page: Some(1),
                next_page: None,
            }])
            .unwrap();

        let key = store.pagination_key(1).unwrap().unwrap();
        assert_eq!(key.prev_page, Some(1));
        assert_eq!(key.next_page, None);
        assert_eq!(store.stats().unwrap().total_keys, 1);
    }

    #[test]
    fn sqlite_transaction_rolls_back_on_error() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();
        store.insert_photos(&[cached(1, "fruits")]).unwrap();

        let result = store.transaction(&mut |writer| {
            writer.delete_all_photos()?;
            writer.insert_photos(&[cached(2, "fruits")])?;
            Err(CacheError::QueryFailed("simulated".to_string()))
        });

        assert!(result.is_err());
        let ids: Vec<u64> = store
            .query_photos("fruits", 0, 10)
            .unwrap()
            .iter()
            .map(CachedPhoto::id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn sqlite_commit_notifies_subscribers() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();
        let changes = store.subscribe();

        store.insert_photos(&[cached(1, "fruits")]).unwrap();

        assert!(changes.try_recv().is_ok());
    }

    #[test]
    fn sqlite_clear_removes_photos_and_keys() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();
        store.insert_photos(&[cached(1, "fruits"), cached(2, "cats")]).unwrap();
        store
            .insert_keys(&[PaginationKey {
                photo_id: 1,
                prev_page: None,
                next_page: Some(2),
            }])
            .unwrap();

        store.clear().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_photos, 0);
        assert_eq!(stats.total_keys, 0);
        assert!(stats.search_terms.is_empty());
    }

    #[test]
    fn sqlite_insert_before_sorts_ahead_of_existing_rows() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();
        store.insert_photos(&[cached(3, "fruits"), cached(4, "fruits")]).unwrap();

        store
            .transaction(&mut |writer| {
                writer.insert_photos_before(&[cached(1, "fruits"), cached(2, "fruits")])
            })
            .unwrap();

        let ids: Vec<u64> = store
            .query_photos("fruits", 0, 10)
            .unwrap()
            .iter()
            .map(CachedPhoto::id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn sqlite_repeated_photo_keeps_its_position() {
        let store = SqlitePhotoStore::open_in_memory().unwrap();
        store.insert_photos(&[cached(1, "fruits"), cached(2, "fruits")]).unwrap();

        let mut repeated = cached(2, "fruits");
        repeated.photo.likes = 999;
        store.insert_photos(&[repeated, cached(3, "fruits")]).unwrap();

        let rows = store.query_photos("fruits", 0, 10).unwrap();
        let ids: Vec<u64> = rows.iter().map(CachedPhoto::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rows[1].photo.likes, 999);
    }
}
