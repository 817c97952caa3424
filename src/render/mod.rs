//! Rendering Pipeline
//!
//! Draws a decoded DNA onto a fresh canvas: background first, then every
//! layer in order under its own blend mode and opacity. Layer images are
//! resolved up front so a missing asset discards the edition before anything
//! is drawn.

mod assets;
mod blend;
mod canvas;
mod color;
mod text;

pub use assets::{resolve_all, AssetResolver, FileAssets, MemoryAssets};
pub use blend::{blend_channel, blend_pixel, composite};
pub use canvas::{DrawSurface, RasterCanvas};
pub use color::{background_color, hsl_to_rgba, parse_hex_color, parse_percentage};
pub use text::{TextEngine, TextStyle};

use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use log::debug;
use rand::Rng;

use crate::config::{BackgroundConfig, FormatConfig, GeneratorConfig, TextConfig};
use crate::dna::DecodedLayer;
use crate::error::Result;
use crate::metadata::Attribute;

/// Output of rendering one edition.
#[derive(Debug, Clone)]
pub struct RenderedEdition {
    pub image: RgbaImage,
    /// `display name -> element name`, in layer order
    pub attributes: Vec<Attribute>,
    /// Canvas after each layer, when animation capture is on
    pub frames: Vec<RgbaImage>,
}

pub struct Renderer {
    format: FormatConfig,
    background: BackgroundConfig,
    text: TextConfig,
    capture_frames: bool,
    assets: Box<dyn AssetResolver>,
    /// Present in text-only mode
    text_engine: Option<Arc<Mutex<TextEngine>>>,
}

impl Renderer {
    pub fn new(config: &GeneratorConfig, assets: Box<dyn AssetResolver>) -> Self {
        Self {
            format: config.format.clone(),
            background: config.background.clone(),
            text: config.text.clone(),
            capture_frames: config.gif.export,
            assets,
            text_engine: config
                .text
                .only
                .then(|| Arc::new(Mutex::new(TextEngine::from_config(&config.text)))),
        }
    }

    /// Render onto a new [`RasterCanvas`] sized from the format settings.
    pub fn render<R: Rng + ?Sized>(&self, layers: &[DecodedLayer], rng: &mut R) -> Result<RenderedEdition> {
        let mut canvas = RasterCanvas::new(self.format.width, self.format.height, self.format.smoothing);
        if let Some(engine) = &self.text_engine {
            canvas = canvas.with_text_engine(Arc::clone(engine));
        }
        let (attributes, frames) = self.render_onto(&mut canvas, layers, rng)?;
        Ok(RenderedEdition {
            image: canvas.into_image(),
            attributes,
            frames,
        })
    }

    /// Render onto any surface, returning the attributes and captured frames.
    pub fn render_onto<S: DrawSurface, R: Rng + ?Sized>(
        &self,
        surface: &mut S,
        layers: &[DecodedLayer],
        rng: &mut R,
    ) -> Result<(Vec<Attribute>, Vec<RgbaImage>)> {
        let images = if self.text.only {
            Vec::new()
        } else {
            resolve_all(self.assets.as_ref(), layers)?
        };

        surface.clear();
        if self.background.generate {
            surface.fill(background_color(&self.background, rng));
        }

        let text_color = parse_hex_color(&self.text.color).unwrap_or(Rgba([255, 255, 255, 255]));
        let text_style = TextStyle::from_config(&self.text, text_color);
        let mut attributes = Vec::with_capacity(layers.len());
        let mut frames = Vec::new();

        for (index, layer) in layers.iter().enumerate() {
            surface.set_blend(layer.blend);
            surface.set_opacity(layer.opacity);

            match images.get(index) {
                Some(image) => surface.draw_image(image),
                None => {
                    let label = format!(
                        "{}{}{}",
                        layer.display_name, self.text.spacer, layer.selected_element.name
                    );
                    let row = u32::try_from(index + 1).unwrap_or(u32::MAX);
                    let y = self.text.y_gap.saturating_mul(row);
                    surface.fill_text(&label, self.text.x_gap, y, &text_style)?;
                }
            }

            attributes.push(Attribute::new(&layer.display_name, &layer.selected_element.name));
            if self.capture_frames {
                frames.push(surface.snapshot());
            }
        }

        debug!("Rendered {} layers", layers.len());
        Ok((attributes, frames))
    }
}
