//! Test fixtures for books and lookup responses.

use bookshelf_core::{BookFields, ImageLinks, Volume, VolumeInfo, VolumesResponse};

/// A lookup candidate with no description and no cover.
pub fn volume(title: &str, authors: &[&str], published_date: &str) -> VolumeInfo {
    VolumeInfo {
        title: Some(title.to_string()),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        published_date: Some(published_date.to_string()),
        description: None,
        image_links: None,
    }
}

/// Adds a description to a candidate.
pub fn with_description(mut info: VolumeInfo, description: &str) -> VolumeInfo {
    info.description = Some(description.to_string());
    info
}

/// Adds a thumbnail to a candidate.
pub fn with_thumbnail(mut info: VolumeInfo, thumbnail: &str) -> VolumeInfo {
    info.image_links = Some(ImageLinks {
        thumbnail: Some(thumbnail.to_string()),
        small_thumbnail: None,
    });
    info
}

/// A lookup response listing `items` in order.
pub fn volumes(items: Vec<VolumeInfo>) -> VolumesResponse {
    VolumesResponse {
        total_items: items.len() as u64,
        items: items
            .into_iter()
            .map(|volume_info| Volume { volume_info })
            .collect(),
    }
}

/// The candidate used by the "como estas" scenario.
pub fn como_estas() -> VolumeInfo {
    volume("Como Estás", &["A. Autor"], "2001")
}

/// Book fields as a user would submit them.
pub fn book(title: &str) -> BookFields {
    BookFields::titled(title)
}

/// JSON body for `POST /api/books`.
pub fn book_json(title: &str) -> serde_json::Value {
    serde_json::json!({ "title": title })
}
