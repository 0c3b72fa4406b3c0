//! Attention heuristic for `cover` crops.
//!
//! Scores crop windows by local gradient energy so the crop keeps the
//! visually busiest region of the image instead of a fixed corner.

use image::{GrayImage, Luma, RgbaImage};

/// Cheap Rec.601 luma conversion; alpha scales the contribution so fully
/// transparent pixels carry no energy.
pub(crate) fn luma_of(img: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let luma = 0.299 * f32::from(p[0]) + 0.587 * f32::from(p[1]) + 0.114 * f32::from(p[2]);
        let alpha = f32::from(p[3]) / 255.0;
        Luma([(luma * alpha) as u8])
    })
}

/// Pick the start offset of the crop window with the highest gradient
/// energy along one axis.
///
/// `horizontal` selects a window over columns (x offset); otherwise over
/// rows (y offset). Returns 0 when the window does not leave any slack.
pub(crate) fn attention_window_start(gray: &GrayImage, window: u32, horizontal: bool) -> u32 {
    let (width, height) = gray.dimensions();
    let len = if horizontal { width } else { height };
    if window == 0 || window >= len {
        return 0;
    }

    let mut profile = vec![0u64; len as usize];
    for y in 0..height {
        for x in 0..width {
            let here = i64::from(gray.get_pixel(x, y)[0]);
            let mut energy = 0u64;
            if x + 1 < width {
                energy += here.abs_diff(i64::from(gray.get_pixel(x + 1, y)[0]));
            }
            if y + 1 < height {
                energy += here.abs_diff(i64::from(gray.get_pixel(x, y + 1)[0]));
            }
            let index = if horizontal { x } else { y } as usize;
            profile[index] += energy;
        }
    }

    // Sliding window over the energy profile; ties keep the leftmost start.
    let window = window as usize;
    let mut sum: u64 = profile[..window].iter().sum();
    let mut best_sum = sum;
    let mut best_start = 0usize;
    for start in 1..=(len as usize - window) {
        sum = sum - profile[start - 1] + profile[start + window - 1];
        if sum > best_sum {
            best_sum = sum;
            best_start = start;
        }
    }
    best_start as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_right_half() -> GrayImage {
        GrayImage::from_fn(64, 16, |x, y| {
            if x >= 32 && (x + y) % 2 == 0 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn window_lands_on_busy_region() {
        let gray = checker_right_half();
        let start = attention_window_start(&gray, 16, true);
        assert!(start >= 24, "expected crop near the busy right half, got {start}");
    }

    #[test]
    fn no_slack_means_zero_offset() {
        let gray = GrayImage::new(8, 8);
        assert_eq!(attention_window_start(&gray, 8, true), 0);
        assert_eq!(attention_window_start(&gray, 16, false), 0);
    }
}
