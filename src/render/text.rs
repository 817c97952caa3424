//! Text labels for text-only editions
//!
//! Labels are shaped with parley against a system font family (or a font
//! file) and rasterised with vello_cpu into a canvas-sized layer, which the
//! canvas then composites under its current blend state.

use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use log::{debug, warn};

use crate::config::{TextAlign, TextBaseline, TextConfig};
use crate::error::{Result, StrataError};

/// Families tried after the configured one.
const FALLBACK_FAMILIES: &str = "monospace, sans-serif";

/// Brush carried through parley layouts; the paint is set per label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LabelBrush;

/// Resolved drawing style for one label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub family: String,
    pub size: f32,
    pub weight: f32,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub color: Rgba<u8>,
}

impl TextStyle {
    pub fn from_config(text: &TextConfig, color: Rgba<u8>) -> Self {
        Self {
            family: text.family.clone(),
            size: text.size.max(1) as f32,
            weight: text.weight_value().unwrap_or(400.0),
            align: text.align,
            baseline: text.baseline,
            color,
        }
    }
}

/// Shaping state reused across labels.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<LabelBrush>,
    font_file: Option<PathBuf>,
    /// Family registered from `font_file`, once loaded
    file_family: Option<String>,
    warned_no_font: bool,
}

impl TextEngine {
    pub fn new(font_file: Option<PathBuf>) -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font_file,
            file_family: None,
            warned_no_font: false,
        }
    }

    pub fn from_config(text: &TextConfig) -> Self {
        Self::new(text.font_file.clone())
    }

    fn registered_family(&mut self) -> Result<Option<String>> {
        if self.file_family.is_some() {
            return Ok(self.file_family.clone());
        }
        let Some(path) = &self.font_file else {
            return Ok(None);
        };
        let bytes = fs::read(path).map_err(|e| StrataError::InvalidConfig {
            reason: format!("cannot read font file {}: {}", path.display(), e),
        })?;
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            StrataError::InvalidConfig {
                reason: format!("no font families in {}", path.display()),
            }
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StrataError::InvalidConfig {
                reason: format!("font in {} has no family name", path.display()),
            })?
            .to_string();
        debug!("Registered font family '{}' from {}", name, path.display());
        self.file_family = Some(name);
        Ok(self.file_family.clone())
    }

    fn layout(&mut self, text: &str, style: &TextStyle) -> Result<parley::Layout<LabelBrush>> {
        let family = match self.registered_family()? {
            Some(name) => name,
            None => style.family.clone(),
        };
        let stack = format!("\"{}\", {}", family, FALLBACK_FAMILIES);

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(stack)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(style.weight),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(LabelBrush));

        let mut layout: parley::Layout<LabelBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Rasterise `text` anchored at `(x, y)` onto a transparent
    /// `width x height` layer.
    ///
    /// Returns `None` when no font could be resolved for the label.
    pub fn rasterize(
        &mut self,
        text: &str,
        x: u32,
        y: u32,
        style: &TextStyle,
        width: u32,
        height: u32,
    ) -> Result<Option<RgbaImage>> {
        let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(StrataError::Render {
                    reason: format!("canvas {}x{} is too large for text rendering", width, height),
                })
            }
        };

        if y > height.saturating_add((style.size * 2.0) as u32) {
            return Ok(None);
        }

        let layout = self.layout(text, style)?;
        let Some((ascent, descent, baseline)) = layout.lines().next().map(|line| {
            let metrics = line.metrics();
            (metrics.ascent, metrics.descent, metrics.baseline)
        }) else {
            return Ok(None);
        };

        let anchor_x = x as f32;
        let dx = match style.align {
            TextAlign::Left | TextAlign::Start => anchor_x,
            TextAlign::Center => anchor_x - layout.width() / 2.0,
            TextAlign::Right | TextAlign::End => anchor_x - layout.width(),
        };
        let anchor_y = y as f32;
        let target_baseline = match style.baseline {
            TextBaseline::Top | TextBaseline::Hanging => anchor_y + ascent,
            TextBaseline::Middle => anchor_y + (ascent - descent) / 2.0,
            TextBaseline::Alphabetic | TextBaseline::Ideographic => anchor_y,
            TextBaseline::Bottom => anchor_y - descent,
        };
        let dy = target_baseline - baseline;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        let [r, g, b, a] = style.color.0;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));

        let mut runs = 0usize;
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let source = run.run().font();
                let font = vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(source.data.data().to_vec()),
                    source.index,
                );
                let glyphs = run.positioned_glyphs().map(|glyph| vello_cpu::Glyph {
                    id: glyph.id,
                    x: glyph.x + dx,
                    y: glyph.y + dy,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
                runs += 1;
            }
        }

        if runs == 0 {
            if !self.warned_no_font {
                warn!(
                    "No font found for family '{}'; text labels are not drawn",
                    style.family
                );
                self.warned_no_font = true;
            }
            return Ok(None);
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);

        let mut rgba = pixmap.data_as_u8_slice().to_vec();
        unpremultiply_in_place(&mut rgba);
        RgbaImage::from_raw(width, height, rgba)
            .map(Some)
            .ok_or_else(|| StrataError::Render {
                reason: "text layer size mismatch".to_string(),
            })
    }
}

fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let alpha = px[3] as u32;
        if alpha == 0 || alpha == 255 {
            continue;
        }
        for channel in &mut px[..3] {
            *channel = ((*channel as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}
