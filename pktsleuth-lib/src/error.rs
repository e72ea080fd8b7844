use std::io;
use thiserror::Error;

/// The primary error type for the `pktsleuth` library.
///
/// Every variant is local to a single frame or a single request; nothing here
/// aborts a batch on its own.
#[derive(Error, Debug)]
pub enum SleuthError {
    #[error("Frame {index}: invalid hex input: {message}")]
    InvalidHexInput { index: usize, message: String },

    #[error("Length mismatch: layout expects {expected} bytes, frame has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Unknown checksum algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SleuthError>;
