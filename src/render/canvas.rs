//! Drawing surface
//!
//! The rendering pipeline only needs a handful of canvas operations; they are
//! behind [`DrawSurface`] so compositing can be exercised without real assets.

use std::sync::{Arc, Mutex, PoisonError};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::blend::{blend_pixel, composite};
use super::text::{TextEngine, TextStyle};
use crate::catalog::BlendMode;
use crate::error::Result;

/// The 2D drawing capability the pipeline consumes.
pub trait DrawSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    /// Fill the whole surface with a color under the current blend state.
    fn fill(&mut self, color: Rgba<u8>);

    /// Global alpha applied to subsequent draws.
    fn set_opacity(&mut self, opacity: f32);

    /// Composite operation applied to subsequent draws.
    fn set_blend(&mut self, blend: BlendMode);

    /// Draw an image scaled to the full surface.
    fn draw_image(&mut self, image: &RgbaImage);

    /// Draw a text label anchored at `(x, y)` per the style's align and baseline.
    fn fill_text(&mut self, text: &str, x: u32, y: u32, style: &TextStyle) -> Result<()>;

    /// Copy of the current contents.
    fn snapshot(&self) -> RgbaImage;
}

/// In-memory RGBA canvas.
#[derive(Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
    opacity: f32,
    blend: BlendMode,
    smoothing: bool,
    /// Labels are skipped without one
    text: Option<Arc<Mutex<TextEngine>>>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32, smoothing: bool) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            opacity: 1.0,
            blend: BlendMode::SourceOver,
            smoothing,
            text: None,
        }
    }

    pub fn with_text_engine(mut self, engine: Arc<Mutex<TextEngine>>) -> Self {
        self.text = Some(engine);
        self
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl DrawSurface for RasterCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = blend_pixel(color, *pixel, self.blend, self.opacity);
        }
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn draw_image(&mut self, image: &RgbaImage) {
        if image.dimensions() == self.image.dimensions() {
            composite(&mut self.image, image, self.blend, self.opacity);
            return;
        }
        let filter = if self.smoothing {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };
        let scaled = imageops::resize(image, self.image.width(), self.image.height(), filter);
        composite(&mut self.image, &scaled, self.blend, self.opacity);
    }

    fn fill_text(&mut self, text: &str, x: u32, y: u32, style: &TextStyle) -> Result<()> {
        let Some(engine) = &self.text else {
            return Ok(());
        };
        let (width, height) = self.image.dimensions();
        let layer = engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rasterize(text, x, y, style, width, height)?;
        if let Some(layer) = layer {
            composite(&mut self.image, &layer, self.blend, self.opacity);
        }
        Ok(())
    }

    fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }
}
