//! Color parsing and background colors

use image::Rgba;
use rand::Rng;

use crate::config::BackgroundConfig;

/// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(s: &str) -> Option<Rgba<u8>> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// Parse a CSS percentage (`"80%"`) into a 0-1 fraction.
pub fn parse_percentage(s: &str) -> Option<f64> {
    let value: f64 = s.trim().strip_suffix('%')?.trim().parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value / 100.0)
}

/// Convert HSL (hue in degrees, saturation and lightness in 0-1) to opaque RGBA.
pub fn hsl_to_rgba(hue: f64, saturation: f64, lightness: f64) -> Rgba<u8> {
    let h = hue.rem_euclid(360.0) / 360.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return Rgba([v, v, v, 255]);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |t: f64| {
        let t = t.rem_euclid(1.0);
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round() as u8
    };

    Rgba([channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0), 255])
}

/// Background fill for one edition: the static color, or a random fully
/// saturated hue at the configured brightness.
pub fn background_color<R: Rng + ?Sized>(config: &BackgroundConfig, rng: &mut R) -> Rgba<u8> {
    if config.static_color {
        return parse_hex_color(&config.default).unwrap_or(Rgba([0, 0, 0, 255]));
    }
    let hue = rng.random_range(0..360) as f64;
    let lightness = parse_percentage(&config.brightness).unwrap_or(0.8);
    hsl_to_rgba(hue, 1.0, lightness)
}
