//! Canvas composite operations
//!
//! Separable blend functions followed by source-over alpha compositing, as a
//! 2D canvas applies `globalCompositeOperation` and `globalAlpha`.

use image::{Rgba, RgbaImage};

use crate::catalog::BlendMode;

/// Blend one normalised channel. `base` is the backdrop, `top` the source.
pub fn blend_channel(mode: BlendMode, base: f32, top: f32) -> f32 {
    match mode {
        BlendMode::SourceOver | BlendMode::Lighter => top,
        BlendMode::Multiply => base * top,
        BlendMode::Screen => screen(base, top),
        BlendMode::Overlay => hard_light(top, base),
        BlendMode::Darken => base.min(top),
        BlendMode::Lighten => base.max(top),
        BlendMode::ColorDodge => {
            if base == 0.0 {
                0.0
            } else if top >= 1.0 {
                1.0
            } else {
                (base / (1.0 - top)).min(1.0)
            }
        }
        BlendMode::ColorBurn => {
            if base >= 1.0 {
                1.0
            } else if top == 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - base) / top).min(1.0)
            }
        }
        BlendMode::HardLight => hard_light(base, top),
        BlendMode::SoftLight => {
            if top <= 0.5 {
                base - (1.0 - 2.0 * top) * base * (1.0 - base)
            } else {
                let d = if base <= 0.25 {
                    ((16.0 * base - 12.0) * base + 4.0) * base
                } else {
                    base.sqrt()
                };
                base + (2.0 * top - 1.0) * (d - base)
            }
        }
        BlendMode::Difference => (base - top).abs(),
        BlendMode::Exclusion => base + top - 2.0 * base * top,
    }
}

fn screen(base: f32, top: f32) -> f32 {
    base + top - base * top
}

fn hard_light(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base * 2.0 * top
    } else {
        screen(base, 2.0 * top - 1.0)
    }
}

/// Composite `src` over `dst` with the given mode and layer opacity.
pub fn blend_pixel(src: Rgba<u8>, dst: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    let src_alpha = (src[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if src_alpha == 0.0 {
        return dst;
    }
    let dst_alpha = dst[3] as f32 / 255.0;

    let out_alpha = if mode == BlendMode::Lighter {
        (src_alpha + dst_alpha).min(1.0)
    } else {
        src_alpha + dst_alpha * (1.0 - src_alpha)
    };
    if out_alpha == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| -> u8 {
        let cs = src[i] as f32 / 255.0;
        let cb = dst[i] as f32 / 255.0;
        let premultiplied = if mode == BlendMode::Lighter {
            src_alpha * cs + dst_alpha * cb
        } else {
            let mixed = (1.0 - dst_alpha) * cs + dst_alpha * blend_channel(mode, cb, cs);
            src_alpha * mixed + dst_alpha * cb * (1.0 - src_alpha)
        };
        ((premultiplied / out_alpha).clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_alpha * 255.0).round() as u8,
    ])
}

/// Composite a same-sized image onto the canvas.
pub fn composite(canvas: &mut RgbaImage, layer: &RgbaImage, mode: BlendMode, opacity: f32) {
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        *dst = blend_pixel(*src, *dst, mode, opacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    #[test]
    fn test_source_over_opaque_replaces() {
        assert_eq!(blend_pixel(RED, GREY, BlendMode::SourceOver, 1.0), RED);
    }

    #[test]
    fn test_transparent_source_keeps_backdrop() {
        assert_eq!(blend_pixel(Rgba([9, 9, 9, 0]), GREY, BlendMode::Multiply, 1.0), GREY);
        assert_eq!(blend_pixel(RED, GREY, BlendMode::SourceOver, 0.0), GREY);
    }

    #[test]
    fn test_half_opacity_mixes() {
        let out = blend_pixel(Rgba([255, 255, 255, 255]), Rgba([0, 0, 0, 255]), BlendMode::SourceOver, 0.5);
        assert_eq!(out, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_multiply_and_screen() {
        assert_eq!(blend_pixel(GREY, RED, BlendMode::Multiply, 1.0), Rgba([128, 0, 0, 255]));
        assert_eq!(blend_pixel(GREY, RED, BlendMode::Screen, 1.0), Rgba([255, 128, 128, 255]));
    }

    #[test]
    fn test_over_transparent_backdrop_ignores_mode() {
        let out = blend_pixel(RED, Rgba([0, 0, 0, 0]), BlendMode::Difference, 1.0);
        assert_eq!(out, RED);
    }

    #[test]
    fn test_channel_identities() {
        assert_abs_diff_eq!(blend_channel(BlendMode::Difference, 0.75, 0.25), 0.5);
        assert_abs_diff_eq!(blend_channel(BlendMode::Exclusion, 0.5, 0.5), 0.5);
        assert_abs_diff_eq!(blend_channel(BlendMode::SoftLight, 0.3, 0.5), 0.3);
        assert_abs_diff_eq!(blend_channel(BlendMode::ColorDodge, 0.5, 1.0), 1.0);
        assert_abs_diff_eq!(blend_channel(BlendMode::ColorBurn, 1.0, 0.2), 1.0);
    }

    #[test]
    fn test_lighter_adds() {
        let out = blend_pixel(Rgba([100, 0, 0, 255]), Rgba([100, 50, 0, 255]), BlendMode::Lighter, 1.0);
        assert_eq!(out, Rgba([200, 50, 0, 255]));
    }
}
