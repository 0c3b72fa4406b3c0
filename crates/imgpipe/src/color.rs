//! Dominant-color extraction for palette endpoints.
//!
//! Picks the most saturated, mid-lightness color cluster of a downscaled
//! copy of the image, then darkens it until it reads against a white
//! background (WCAG contrast ratio of at least 3.0).

use std::collections::HashMap;

use crate::error::PipelineError;

/// Fallback when no usable color can be extracted.
pub const DEFAULT_COLOR: &str = "#2172e5";

const MIN_CONTRAST: f64 = 3.0;
const SHADE_STEP: f64 = 0.995;

/// Extract the dominant color as a `#rrggbb` hex string.
pub fn dominant_color(raw: &[u8]) -> Result<String, PipelineError> {
    let thumb = image::load_from_memory(raw)?.thumbnail(64, 64).to_rgba8();

    // Quantize to 4 bits per channel and keep running sums per bucket so
    // the winning bucket reports its average color, not the bucket corner.
    let mut buckets: HashMap<(u8, u8, u8), (u64, u64, u64, u64)> = HashMap::new();
    for pixel in thumb.pixels() {
        if pixel[3] < 128 {
            continue;
        }
        let key = (pixel[0] >> 4, pixel[1] >> 4, pixel[2] >> 4);
        let entry = buckets.entry(key).or_insert((0, 0, 0, 0));
        entry.0 += 1;
        entry.1 += u64::from(pixel[0]);
        entry.2 += u64::from(pixel[1]);
        entry.3 += u64::from(pixel[2]);
    }

    let mut best: Option<([f64; 3], f64)> = None;
    for (count, r_sum, g_sum, b_sum) in buckets.values() {
        let n = *count as f64;
        let rgb = [*r_sum as f64 / n, *g_sum as f64 / n, *b_sum as f64 / n];
        let (saturation, lightness) = saturation_lightness(rgb);
        // Vibrancy weighting: frequency scaled by saturation, discounting
        // colors close to black or white.
        let weight = n * saturation * (1.0 - (2.0 * lightness - 1.0).abs());
        if weight > 0.0 && best.map(|(_, w)| weight > w).unwrap_or(true) {
            best = Some((rgb, weight));
        }
    }

    let Some((mut rgb, _)) = best else {
        return Ok(DEFAULT_COLOR.to_string());
    };

    // Darken in small steps until the color clears the contrast bar.
    let mut iterations = 0;
    while contrast_with_white(rgb) < MIN_CONTRAST && iterations < 1024 {
        rgb = rgb.map(|c| c * SHADE_STEP);
        iterations += 1;
    }

    Ok(format!(
        "#{:02x}{:02x}{:02x}",
        rgb[0].round() as u8,
        rgb[1].round() as u8,
        rgb[2].round() as u8
    ))
}

/// Like [`dominant_color`] but never fails; extraction errors fall back to
/// [`DEFAULT_COLOR`].
pub fn dominant_color_or_default(raw: &[u8]) -> String {
    dominant_color(raw).unwrap_or_else(|_| DEFAULT_COLOR.to_string())
}

fn saturation_lightness(rgb: [f64; 3]) -> (f64, f64) {
    let max = rgb.iter().cloned().fold(0.0f64, f64::max) / 255.0;
    let min = rgb.iter().cloned().fold(255.0f64, f64::min) / 255.0;
    let lightness = (max + min) / 2.0;
    let saturation = if max <= min {
        0.0
    } else if lightness <= 0.5 {
        (max - min) / (max + min)
    } else {
        (max - min) / (2.0 - max - min)
    };
    (saturation, lightness)
}

fn contrast_with_white(rgb: [f64; 3]) -> f64 {
    let luminance = relative_luminance(rgb);
    1.05 / (luminance + 0.05)
}

fn relative_luminance(rgb: [f64; 3]) -> f64 {
    let [r, g, b] = rgb.map(|c| {
        let c = c / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    });
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_of(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(16, 16, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn saturated_image_yields_readable_color() {
        let hex = dominant_color(&png_of([220, 30, 30, 255])).unwrap();
        assert!(hex.starts_with('#') && hex.len() == 7);
        let r = u8::from_str_radix(&hex[1..3], 16).unwrap() as f64;
        let g = u8::from_str_radix(&hex[3..5], 16).unwrap() as f64;
        let b = u8::from_str_radix(&hex[5..7], 16).unwrap() as f64;
        assert!(r > g && r > b, "expected a red-dominant color, got {hex}");
        assert!(contrast_with_white([r, g, b]) >= MIN_CONTRAST);
    }

    #[test]
    fn grayscale_image_falls_back_to_default() {
        let hex = dominant_color(&png_of([128, 128, 128, 255])).unwrap();
        assert_eq!(hex, DEFAULT_COLOR);
    }

    #[test]
    fn garbage_falls_back_via_or_default() {
        assert_eq!(dominant_color_or_default(b"not an image"), DEFAULT_COLOR);
    }
}
