//! Enrichment result and merge policy.
//!
//! The merge is deliberately asymmetric: title, author, and publication
//! date always take the candidate's values, while description and cover
//! image are only filled when the book has none.

use crate::book::{BookFields, MAX_FIELD_LEN};
use crate::volumes::VolumeInfo;

/// Candidate values taken from the top lookup match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub title: Option<String>,
    /// Authors joined with `", "`; `None` when the candidate lists none.
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<&VolumeInfo> for EnrichmentResult {
    fn from(info: &VolumeInfo) -> Self {
        let author = if info.authors.is_empty() {
            None
        } else {
            Some(info.authors.join(", "))
        };

        Self {
            title: info.title.clone(),
            author,
            published_date: info.published_date.clone(),
            description: info.description.clone(),
            thumbnail_url: info
                .image_links
                .as_ref()
                .and_then(|links| links.best())
                .map(str::to_string),
        }
    }
}

impl EnrichmentResult {
    /// Merges the candidate into `fields`.
    ///
    /// Short fields are cut to [`MAX_FIELD_LEN`] characters so the merged
    /// book still passes validation. The cover image is not touched here;
    /// see [`EnrichmentResult::cover_to_fetch`].
    pub fn merge_into(&self, fields: &mut BookFields) {
        fields.title = clipped(&self.title);
        fields.author = clipped(&self.author);
        fields.published_date = clipped(&self.published_date);

        if !fields.has_description() {
            fields.description = self.description.clone();
        }
    }

    /// Thumbnail to mirror into blob storage, if the book still lacks a cover.
    pub fn cover_to_fetch(&self, fields: &BookFields) -> Option<&str> {
        if fields.has_image() {
            return None;
        }
        self.thumbnail_url.as_deref()
    }
}

fn clipped(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.chars().take(MAX_FIELD_LEN).collect())
}
