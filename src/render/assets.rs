//! Trait image resolution
//!
//! Every layer image of an edition is loaded in parallel; compositing waits
//! for all of them and draws in layer order.

use std::collections::HashMap;

use image::RgbaImage;
use log::warn;
use rayon::prelude::*;

use crate::catalog::TraitElement;
use crate::dna::DecodedLayer;
use crate::error::{Result, StrataError};

/// Source of decoded trait images.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, element: &TraitElement) -> Result<RgbaImage>;
}

/// Loads trait images from their catalog path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAssets;

impl AssetResolver for FileAssets {
    fn resolve(&self, element: &TraitElement) -> Result<RgbaImage> {
        let image = image::open(&element.path).map_err(|e| StrataError::AssetLoad {
            path: element.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(image.to_rgba8())
    }
}

/// Pre-decoded images keyed by trait filename.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    images: HashMap<String, RgbaImage>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, filename: &str, image: RgbaImage) -> Self {
        self.images.insert(filename.to_string(), image);
        self
    }
}

impl AssetResolver for MemoryAssets {
    fn resolve(&self, element: &TraitElement) -> Result<RgbaImage> {
        self.images
            .get(&element.filename)
            .cloned()
            .ok_or_else(|| StrataError::AssetLoad {
                path: element.path.clone(),
                reason: "no image registered".to_string(),
            })
    }
}

/// Resolve every layer's image concurrently, returned in layer order.
///
/// The first failure fails the whole edition.
pub fn resolve_all(resolver: &dyn AssetResolver, layers: &[DecodedLayer]) -> Result<Vec<RgbaImage>> {
    layers
        .par_iter()
        .map(|layer| {
            resolver.resolve(&layer.selected_element).inspect_err(|e| {
                warn!("Layer '{}': {}", layer.name, e);
            })
        })
        .collect()
}
