//! Extracted item records
//!
//! An `ItemRecord` is built once per successfully fetched item page and is
//! never mutated afterwards.

use serde::{Deserialize, Serialize};

/// The three-tier note structure of a fragrance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScentPyramid {
    /// Top (opening) notes
    pub top: Vec<String>,

    /// Heart (middle) notes
    pub heart: Vec<String>,

    /// Base notes
    pub base: Vec<String>,
}

impl ScentPyramid {
    /// Returns true if no tier has any note
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.heart.is_empty() && self.base.is_empty()
    }
}

/// Structured result extracted from one item page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Source page URL
    pub url: String,

    /// Brand derived from the URL path
    pub brand: Option<String>,

    /// Display name from the page heading (empty if the heading is absent)
    pub name: String,

    /// Gender qualifier from the page heading (empty if absent)
    pub gender_from_title: String,

    /// Main accords, deduplicated in first-seen order
    pub accords: Vec<String>,

    /// Average rating, typically 0 to 5
    pub rating: Option<f64>,

    pub scent_pyramid: ScentPyramid,

    pub longevity: Option<String>,

    /// Launch year as printed on the page
    pub year: Option<String>,

    /// Gender from the dedicated gender box
    pub gender: Option<String>,
}
