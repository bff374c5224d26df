use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaintError {
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    #[error("Interpolation position {0} is outside of [0, 1]")]
    InvalidPosition(f32),

    #[error("Strip {strip} was asked for a pass of {duration_ms} ms")]
    ZeroDuration { strip: usize, duration_ms: u64 },

    #[error("Flushing strip {strip} failed: {source}")]
    HardwareFlushFailure {
        strip: usize,
        #[source]
        source: io::Error,
    },

    #[error("Cannot load image {identifier}: {reason}")]
    ImageLoad { identifier: String, reason: String },

    #[error("Cannot read settings: {0}")]
    Settings(String),

    #[error("Terminal I/O failed: {0}")]
    Terminal(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PaintError>;
