use thiserror::Error;

/// Errors produced by the transform pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source stream failed: {0}")]
    Source(String),

    #[error("source stream produced no bytes")]
    EmptySource,

    #[error("source exceeds maximum input size of {0} bytes")]
    TooLarge(usize),

    #[error("transform worker terminated unexpectedly")]
    WorkerGone,
}
