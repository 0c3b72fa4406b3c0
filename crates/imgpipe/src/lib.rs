//! # Imgpipe
//!
//! Image transform pipeline for icon serving. Decodes raw image bytes,
//! resizes them according to request parameters, and re-encodes them for
//! delivery.
//!
//! ## Features
//!
//! - Format-aware output: GIF input stays animated GIF, everything else
//!   becomes lossless WebP
//! - Resize fit policies (contain, cover, fill, inside, outside) with an
//!   attention-based crop anchor for `cover`
//! - Streaming variant that sniffs the output format from the first chunk
//!   and yields the encoded payload as a byte stream
//! - Dominant-color extraction for palette endpoints

mod attention;
pub mod color;
pub mod error;
pub mod params;
pub mod stream;
pub mod transform;

pub use color::{DEFAULT_COLOR, dominant_color, dominant_color_or_default};
pub use error::PipelineError;
pub use params::{FitMode, ResizeParams};
pub use stream::{StreamedImage, transform_stream};
pub use transform::{TransformOutput, is_gif, transform, transform_async};
