//! Volume lookup response types.
//!
//! Mirrors the subset of the Books API `volumes` search response the
//! worker reads. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Response from `GET /volumes?q=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesResponse {
    #[serde(default)]
    pub total_items: u64,
    /// Absent entirely when nothing matches.
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Preferred cover source: the thumbnail, else the small thumbnail.
    /// An empty link counts as missing.
    pub fn best(&self) -> Option<&str> {
        present(&self.thumbnail).or_else(|| present(&self.small_thumbnail))
    }
}

fn present(link: &Option<String>) -> Option<&str> {
    link.as_deref().filter(|url| !url.is_empty())
}

impl VolumesResponse {
    /// The first candidate, if the lookup matched anything.
    pub fn top(&self) -> Option<&VolumeInfo> {
        self.items.first().map(|v| &v.volume_info)
    }
}
