//! Layer Catalog Module
//!
//! Loads the ordered trait catalogs each wave composes from.

mod element;
mod scan;

pub use element::{BlendMode, Layer, TraitElement, TOKEN_SEPARATOR};
pub use scan::{clean_name, layers_setup, parse_rarity_weight, scan_layer, DEFAULT_WEIGHT};
