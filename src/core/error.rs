//! Error types for the FTRL engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FtrlError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model not initialized: call fit or init_model first")]
    ModelNotInitialized,

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Invalid label: expected 0 or 1, got {0}")]
    InvalidLabel(f32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, FtrlError>;
