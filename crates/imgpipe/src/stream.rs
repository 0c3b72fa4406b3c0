//! Streaming transform variant.
//!
//! The output content type only depends on the first magic bytes, so it is
//! decided as soon as the first chunk arrives and the caller can start
//! writing response headers while the rest of the source is still in
//! flight. Raster codecs need random access, so the input is spooled (up
//! to a configured cap) before the blocking transform runs; the encoded
//! payload is handed back as a chunked byte stream.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::PipelineError;
use crate::params::ResizeParams;
use crate::transform::{is_gif, transform};

const OUTPUT_CHUNK: usize = 64 * 1024;

/// A transform whose payload is still being produced.
#[derive(Debug)]
pub struct StreamedImage {
    pub content_type: &'static str,
    pub stream: ReceiverStream<Result<Bytes, PipelineError>>,
}

/// Transform a byte stream, yielding the encoded payload incrementally.
///
/// Fails fast when the source yields nothing or its first chunk cannot be
/// read; later source or codec failures surface as items on the returned
/// stream.
pub async fn transform_stream<S, E>(
    params: ResizeParams,
    mut source: S,
    max_input_bytes: usize,
) -> Result<StreamedImage, PipelineError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let first = match source.next().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => return Err(PipelineError::Source(e.to_string())),
        None => return Err(PipelineError::EmptySource),
    };

    let content_type = if is_gif(&first) {
        "image/gif"
    } else {
        "image/webp"
    };

    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut buf = Vec::with_capacity(first.len());
        buf.extend_from_slice(&first);

        while let Some(chunk) = source.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(Err(PipelineError::Source(e.to_string()))).await;
                    return;
                }
            };
            if buf.len() + chunk.len() > max_input_bytes {
                let _ = tx.send(Err(PipelineError::TooLarge(max_input_bytes))).await;
                return;
            }
            buf.extend_from_slice(&chunk);
        }

        debug!(input_bytes = buf.len(), "source drained, transforming");
        let result = tokio::task::spawn_blocking(move || transform(&params, &buf))
            .await
            .map_err(|_| PipelineError::WorkerGone)
            .and_then(|r| r);

        match result {
            Ok(output) => {
                let payload = output.payload;
                let mut offset = 0;
                while offset < payload.len() {
                    let end = (offset + OUTPUT_CHUNK).min(payload.len());
                    if tx.send(Ok(payload.slice(offset..end))).await.is_err() {
                        // Receiver went away; nothing left to do.
                        return;
                    }
                    offset = end;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
            }
        }
    });

    Ok(StreamedImage {
        content_type,
        stream: ReceiverStream::new(rx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FitMode;
    use image::{Rgba, RgbaImage};
    use std::convert::Infallible;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(24, 24, Rgba([10, 200, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn chunked(raw: Vec<u8>) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        let chunks: Vec<Result<Bytes, Infallible>> = raw
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        futures::stream::iter(chunks)
    }

    #[tokio::test]
    async fn streams_webp_payload() {
        let params = ResizeParams::new(Some(8), Some(8), FitMode::Cover);
        let streamed = transform_stream(params, chunked(png_bytes()), 1 << 20)
            .await
            .unwrap();
        assert_eq!(streamed.content_type, "image/webp");

        let chunks: Vec<_> = streamed.stream.collect().await;
        let payload: Vec<u8> = chunks
            .into_iter()
            .map(|c| c.unwrap())
            .flatten()
            .collect();
        let rendered = image::load_from_memory(&payload).unwrap();
        assert_eq!((rendered.width(), rendered.height()), (8, 8));
    }

    #[tokio::test]
    async fn empty_source_fails_fast() {
        let source = futures::stream::iter(Vec::<Result<Bytes, Infallible>>::new());
        let err = transform_stream(ResizeParams::default(), source, 1 << 20)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptySource));
    }

    #[tokio::test]
    async fn oversized_source_is_rejected() {
        let streamed = transform_stream(ResizeParams::default(), chunked(png_bytes()), 16)
            .await
            .unwrap();
        let chunks: Vec<_> = streamed.stream.collect().await;
        assert!(matches!(
            chunks.last(),
            Some(Err(PipelineError::TooLarge(16)))
        ));
    }
}
