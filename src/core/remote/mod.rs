//! # Remote Module
//!
//! Fetches pages of photo search results.
//!
//! ## Sources
//! - `PixabayClient` - The PixaBay HTTP API
//! - `InMemorySource` - Scripted pages for testing

mod memory;
mod pixabay;

pub use memory::InMemorySource;
pub use pixabay::PixabayClient;

use crate::core::model::Photo;
use crate::error::RemoteError;
use serde::{Deserialize, Serialize};

/// One page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Already normalized query
    pub query: String,
    /// 1-based page index
    pub page: u32,
    /// Overrides the server's default page size when set
    pub per_page: Option<u32>,
}

/// One page of search results, as the API returns it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "totalHits", default)]
    pub total_hits: u64,
    #[serde(rename = "hits", default)]
    pub images: Vec<PhotoDto>,
}

/// A photo as the API returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoDto {
    pub id: u64,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub tags: String,
    #[serde(rename = "previewURL", default)]
    pub preview_url: String,
    #[serde(rename = "webformatURL", default)]
    pub web_format_url: String,
    #[serde(rename = "largeImageURL", default)]
    pub large_image_url: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub downloads: u64,
}

impl From<PhotoDto> for Photo {
    fn from(dto: PhotoDto) -> Self {
        Photo {
            id: dto.id,
            user: dto.user,
            tags: dto.tags,
            preview_url: dto.preview_url,
            web_format_url: dto.web_format_url,
            large_image_url: dto.large_image_url,
            likes: dto.likes,
            comments: dto.comments,
            downloads: dto.downloads,
        }
    }
}

impl From<&Photo> for PhotoDto {
    fn from(photo: &Photo) -> Self {
        PhotoDto {
            id: photo.id,
            user: photo.user.clone(),
            tags: photo.tags.clone(),
            preview_url: photo.preview_url.clone(),
            web_format_url: photo.web_format_url.clone(),
            large_image_url: photo.large_image_url.clone(),
            likes: photo.likes,
            comments: photo.comments,
            downloads: photo.downloads,
        }
    }
}

/// Trait for remote photo sources
pub trait PhotoSource: Send + Sync {
    /// Fetch a single page of results
    fn search_photos(&self, request: &SearchRequest) -> Result<SearchResponse, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_api_field_names() {
        let json = r#"{
            "total": 4692,
            "totalHits": 500,
            "hits": [{
                "id": 195893,
                "pageURL": "https://pixabay.com/en/blossom-bloom-flower-195893/",
                "type": "photo",
                "tags": "blossom, bloom, flower",
                "previewURL": "https://cdn.pixabay.com/photo/2013/10/15/09/12/flower-195893_150.jpg",
                "webformatURL": "https://pixabay.com/get/35bbf209e13e39d2_640.jpg",
                "largeImageURL": "https://pixabay.com/get/ed6a99fd0a76647_1280.jpg",
                "views": 7671,
                "downloads": 6439,
                "likes": 5,
                "comments": 2,
                "user_id": 48777,
                "user": "Josch13"
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total_hits, 500);
        assert_eq!(response.images.len(), 1);

        let photo = Photo::from(response.images[0].clone());
        assert_eq!(photo.id, 195893);
        assert_eq!(photo.user, "Josch13");
        assert_eq!(photo.tags, "blossom, bloom, flower");
        assert!(photo.large_image_url.ends_with("_1280.jpg"));
        assert_eq!(photo.downloads, 6439);
    }

    #[test]
    fn response_without_hits_is_empty_page() {
        let response: SearchResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(response.images.is_empty());
    }
}
