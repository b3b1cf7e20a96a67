//! URL handling module for Sillage
//!
//! This module provides item link normalization for discovery and brand
//! derivation from item URLs.

mod brand;
mod normalize;

pub use brand::brand_from_url;
pub use normalize::{is_item_link, normalize_item_url};
