//! Buffer transforms: decode, resize per fit policy, re-encode.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, ExtendedColorType, Frame, RgbaImage, imageops};
use tracing::trace;

use crate::attention::{attention_window_start, luma_of};
use crate::error::PipelineError;
use crate::params::{FitMode, ResizeParams};

const FILTER: FilterType = FilterType::Lanczos3;

/// A fully rendered response payload.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub content_type: &'static str,
    pub payload: Bytes,
}

/// GIF sources keep their animation; everything else re-encodes as WebP.
pub fn is_gif(raw: &[u8]) -> bool {
    raw.len() >= 3 && &raw[..3] == b"GIF"
}

/// Transform raw image bytes according to the resize parameters.
///
/// This is CPU-bound; async callers should go through [`transform_async`].
pub fn transform(params: &ResizeParams, raw: &[u8]) -> Result<TransformOutput, PipelineError> {
    if is_gif(raw) {
        transform_gif(params, raw)
    } else {
        transform_still(params, raw)
    }
}

/// Run [`transform`] on the blocking pool so the event loop stays free for
/// other requests.
pub async fn transform_async(
    params: ResizeParams,
    raw: Bytes,
) -> Result<TransformOutput, PipelineError> {
    tokio::task::spawn_blocking(move || transform(&params, &raw))
        .await
        .map_err(|_| PipelineError::WorkerGone)?
}

fn transform_still(params: &ResizeParams, raw: &[u8]) -> Result<TransformOutput, PipelineError> {
    let img = image::load_from_memory(raw)?.to_rgba8();
    let op = plan(img.width(), img.height(), params);
    trace!(?op, "transforming still image");

    let mut anchor = None;
    let out = apply(&img, &op, &mut anchor);

    let mut encoded = Vec::new();
    WebPEncoder::new_lossless(&mut encoded).encode(
        out.as_raw(),
        out.width(),
        out.height(),
        ExtendedColorType::Rgba8,
    )?;

    Ok(TransformOutput {
        content_type: "image/webp",
        payload: Bytes::from(encoded),
    })
}

fn transform_gif(params: &ResizeParams, raw: &[u8]) -> Result<TransformOutput, PipelineError> {
    let decoder = GifDecoder::new(Cursor::new(raw))?;
    let frames = decoder.into_frames().collect_frames()?;
    let first = frames.first().ok_or(PipelineError::EmptySource)?;
    let op = plan(first.buffer().width(), first.buffer().height(), params);
    trace!(?op, frames = frames.len(), "transforming animated gif");

    // The first frame anchors the crop so the animation does not wander.
    let mut anchor = None;
    let mut out_frames = Vec::with_capacity(frames.len());
    for frame in frames {
        let delay = frame.delay();
        let buffer = frame.into_buffer();
        out_frames.push(Frame::from_parts(
            apply(&buffer, &op, &mut anchor),
            0,
            0,
            delay,
        ));
    }

    let mut encoded = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut encoded, 10);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(out_frames)?;
    }

    Ok(TransformOutput {
        content_type: "image/gif",
        payload: Bytes::from(encoded),
    })
}

/// Resolved geometry for one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResizeOp {
    /// No constraint given; re-encode only.
    Keep,
    /// Resample to exactly this size.
    Scale { w: u32, h: u32 },
    /// Resample to the scale size, then crop the excess down to the output
    /// size, anchored by the attention heuristic.
    ScaleCrop {
        scale_w: u32,
        scale_h: u32,
        out_w: u32,
        out_h: u32,
    },
    /// Resample to the scale size, then center onto a transparent canvas.
    ScalePad {
        scale_w: u32,
        scale_h: u32,
        canvas_w: u32,
        canvas_h: u32,
    },
}

pub(crate) fn plan(src_w: u32, src_h: u32, params: &ResizeParams) -> ResizeOp {
    match (params.width, params.height) {
        (None, None) => ResizeOp::Keep,
        // A single constrained dimension degenerates to an aspect-preserving
        // scale for every fit policy.
        (Some(w), None) => ResizeOp::Scale {
            w,
            h: other_dim(src_h, src_w, w),
        },
        (None, Some(h)) => ResizeOp::Scale {
            w: other_dim(src_w, src_h, h),
            h,
        },
        (Some(w), Some(h)) => {
            let fit_inside = (f64::from(w) / f64::from(src_w)).min(f64::from(h) / f64::from(src_h));
            let fit_outside =
                (f64::from(w) / f64::from(src_w)).max(f64::from(h) / f64::from(src_h));
            match params.fit {
                FitMode::Fill => ResizeOp::Scale { w, h },
                FitMode::Inside => ResizeOp::Scale {
                    w: scale_dim(src_w, fit_inside),
                    h: scale_dim(src_h, fit_inside),
                },
                FitMode::Outside => ResizeOp::Scale {
                    w: scale_dim(src_w, fit_outside),
                    h: scale_dim(src_h, fit_outside),
                },
                FitMode::Cover => ResizeOp::ScaleCrop {
                    scale_w: scale_dim(src_w, fit_outside).max(w),
                    scale_h: scale_dim(src_h, fit_outside).max(h),
                    out_w: w,
                    out_h: h,
                },
                FitMode::Contain => ResizeOp::ScalePad {
                    scale_w: scale_dim(src_w, fit_inside).min(w),
                    scale_h: scale_dim(src_h, fit_inside).min(h),
                    canvas_w: w,
                    canvas_h: h,
                },
            }
        }
    }
}

fn scale_dim(src: u32, factor: f64) -> u32 {
    (f64::from(src) * factor).round().max(1.0) as u32
}

fn other_dim(other_src: u32, src: u32, target: u32) -> u32 {
    (f64::from(other_src) * f64::from(target) / f64::from(src))
        .round()
        .max(1.0) as u32
}

fn apply(img: &RgbaImage, op: &ResizeOp, anchor: &mut Option<(u32, u32)>) -> RgbaImage {
    match *op {
        ResizeOp::Keep => img.clone(),
        ResizeOp::Scale { w, h } => imageops::resize(img, w, h, FILTER),
        ResizeOp::ScaleCrop {
            scale_w,
            scale_h,
            out_w,
            out_h,
        } => {
            let scaled = imageops::resize(img, scale_w, scale_h, FILTER);
            let (x, y) = *anchor.get_or_insert_with(|| crop_anchor(&scaled, out_w, out_h));
            imageops::crop_imm(&scaled, x, y, out_w, out_h).to_image()
        }
        ResizeOp::ScalePad {
            scale_w,
            scale_h,
            canvas_w,
            canvas_h,
        } => {
            let scaled = imageops::resize(img, scale_w, scale_h, FILTER);
            let mut canvas = RgbaImage::new(canvas_w, canvas_h);
            let x = i64::from((canvas_w - scale_w) / 2);
            let y = i64::from((canvas_h - scale_h) / 2);
            imageops::overlay(&mut canvas, &scaled, x, y);
            canvas
        }
    }
}

fn crop_anchor(scaled: &RgbaImage, out_w: u32, out_h: u32) -> (u32, u32) {
    let gray = luma_of(scaled);
    let x = if scaled.width() > out_w {
        attention_window_start(&gray, out_w, true)
    } else {
        0
    };
    let y = if scaled.height() > out_h {
        attention_window_start(&gray, out_h, false)
    } else {
        0
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::{Delay, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([200, 40, 40, 255])
            } else {
                Rgba([40, 40, 200, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn gif_bytes(frames: u32, width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut out, 10);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            for i in 0..frames {
                let shade = (i * 80 % 255) as u8;
                let img = RgbaImage::from_pixel(width, height, Rgba([shade, 255 - shade, 0, 255]));
                encoder
                    .encode_frames([Frame::from_parts(
                        img,
                        0,
                        0,
                        Delay::from_numer_denom_ms(100, 1),
                    )])
                    .unwrap();
            }
        }
        out
    }

    #[test]
    fn plan_single_dimension_keeps_aspect() {
        let params = ResizeParams::new(Some(16), None, FitMode::Cover);
        assert_eq!(plan(64, 32, &params), ResizeOp::Scale { w: 16, h: 8 });
    }

    #[test]
    fn plan_cover_scales_to_cover_and_crops() {
        let params = ResizeParams::new(Some(16), Some(16), FitMode::Cover);
        assert_eq!(
            plan(64, 32, &params),
            ResizeOp::ScaleCrop {
                scale_w: 32,
                scale_h: 16,
                out_w: 16,
                out_h: 16,
            }
        );
    }

    #[test]
    fn plan_contain_pads_to_exact_canvas() {
        let params = ResizeParams::new(Some(32), Some(32), FitMode::Contain);
        assert_eq!(
            plan(64, 32, &params),
            ResizeOp::ScalePad {
                scale_w: 32,
                scale_h: 16,
                canvas_w: 32,
                canvas_h: 32,
            }
        );
    }

    #[test]
    fn plan_inside_and_outside() {
        let inside = ResizeParams::new(Some(16), Some(16), FitMode::Inside);
        assert_eq!(plan(64, 32, &inside), ResizeOp::Scale { w: 16, h: 8 });
        let outside = ResizeParams::new(Some(16), Some(16), FitMode::Outside);
        assert_eq!(plan(64, 32, &outside), ResizeOp::Scale { w: 32, h: 16 });
    }

    #[test]
    fn still_image_becomes_lossless_webp() {
        let raw = png_bytes(64, 32);
        let params = ResizeParams::new(Some(16), Some(16), FitMode::Cover);
        let out = transform(&params, &raw).unwrap();
        assert_eq!(out.content_type, "image/webp");
        assert_eq!(&out.payload[..4], b"RIFF");
        assert_eq!(&out.payload[8..12], b"WEBP");

        let rendered = image::load_from_memory(&out.payload).unwrap();
        assert_eq!((rendered.width(), rendered.height()), (16, 16));
    }

    #[test]
    fn contain_letterboxes_with_transparency() {
        let raw = png_bytes(64, 32);
        let params = ResizeParams::new(Some(32), Some(32), FitMode::Contain);
        let out = transform(&params, &raw).unwrap();
        let rendered = image::load_from_memory(&out.payload).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (32, 32));
        assert_eq!(rendered.get_pixel(0, 0)[3], 0, "corner should be padding");
        assert_eq!(rendered.get_pixel(16, 16)[3], 255, "center should be image");
    }

    #[test]
    fn gif_stays_animated_gif() {
        let raw = gif_bytes(2, 10, 10);
        let params = ResizeParams::new(Some(5), None, FitMode::Contain);
        let out = transform(&params, &raw).unwrap();
        assert_eq!(out.content_type, "image/gif");
        assert_eq!(&out.payload[..3], b"GIF");

        let decoder = GifDecoder::new(Cursor::new(&out.payload[..])).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].buffer().dimensions(), (5, 5));
    }

    #[test]
    fn unconstrained_request_reencodes_only() {
        let raw = png_bytes(20, 10);
        let out = transform(&ResizeParams::default(), &raw).unwrap();
        let rendered = image::load_from_memory(&out.payload).unwrap();
        assert_eq!((rendered.width(), rendered.height()), (20, 10));
    }

    #[test]
    fn garbage_input_is_a_typed_error() {
        let err = transform(&ResizeParams::default(), b"definitely not an image").unwrap_err();
        assert!(matches!(err, PipelineError::Image(_)));
    }
}
