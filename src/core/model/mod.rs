//! # Model Module
//!
//! Photo records at each layer:
//! - `CachedPhoto` - a row in the local cache, tagged with its search term
//! - `Photo` - the domain record handed out by the repository
//! - `PhotoView` - display-ready fields for a UI
//!
//! Plus `PaginationKey`, the per-photo page bookkeeping written by the
//! remote mediator.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A photo as the rest of the application sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: u64,
    /// Owner username
    pub user: String,
    /// Comma separated tag string, as returned by the API
    pub tags: String,
    pub preview_url: String,
    pub web_format_url: String,
    /// Full resolution image
    pub large_image_url: String,
    pub likes: u64,
    pub comments: u64,
    pub downloads: u64,
}

/// A photo row in the local cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPhoto {
    pub photo: Photo,
    /// Normalized query this photo was fetched for
    pub search_term: String,
    /// Sort order within the cache, assigned by the store on write
    pub position: i64,
    pub cached_at: SystemTime,
}

impl CachedPhoto {
    pub fn new(photo: Photo, search_term: impl Into<String>) -> Self {
        Self {
            photo,
            search_term: search_term.into(),
            position: 0,
            cached_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.photo.id
    }

    pub fn into_domain(self) -> Photo {
        self.photo
    }
}

/// Neighbouring remote pages for one cached photo
///
/// `None` marks a boundary: there is no page before page 1, and nothing
/// after an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationKey {
    pub photo_id: u64,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

/// Display model for a single photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoView {
    pub id: u64,
    pub user_name: String,
    pub tags: Vec<String>,
    pub preview_url: String,
    pub large_image_url: String,
    pub likes: u64,
    pub comments: u64,
    pub downloads: u64,
}

impl From<&Photo> for PhotoView {
    fn from(photo: &Photo) -> Self {
        Self {
            id: photo.id,
            user_name: photo.user.clone(),
            tags: split_tags(&photo.tags),
            preview_url: photo.preview_url.clone(),
            large_image_url: photo.large_image_url.clone(),
            likes: photo.likes,
            comments: photo.comments,
            downloads: photo.downloads,
        }
    }
}

/// Split an API tag string into trimmed, non-empty tags
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_photo(id: u64) -> Photo {
    Photo {
        id,
        user: format!("user{}", id),
        tags: "fruit, apple, red".to_string(),
        preview_url: format!("https://cdn.pixabay.com/preview/{}.jpg", id),
        web_format_url: format!("https://cdn.pixabay.com/web/{}.jpg", id),
        large_image_url: format!("https://cdn.pixabay.com/large/{}.jpg", id),
        likes: id * 10,
        comments: id,
        downloads: id * 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_trims_and_drops_empty() {
        assert_eq!(
            split_tags(" red panda,  animal ,,zoo"),
            vec!["red panda", "animal", "zoo"]
        );
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn photo_view_copies_counters() {
        let photo = sample_photo(7);
        let view = PhotoView::from(&photo);

        assert_eq!(view.id, 7);
        assert_eq!(view.user_name, "user7");
        assert_eq!(view.tags, vec!["fruit", "apple", "red"]);
        assert_eq!(view.likes, 70);
        assert_eq!(view.downloads, 700);
    }
}
