//! Error types for warp point commands and pixel input

use thiserror::Error;

use crate::points::PointId;

/// Errors surfaced by the command boundary and detector input validation.
///
/// The numeric core never fails; these only cover references to points or
/// presets that don't exist and malformed pixel buffers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WarpError {
    #[error("unknown warp point {0}")]
    UnknownPoint(PointId),

    #[error("warp point {0} is locked")]
    PointLocked(PointId),

    #[error("unknown body shape preset '{0}'")]
    UnknownPreset(String),

    #[error("pixel buffer has {actual} bytes, expected {expected} (RGBA)")]
    PixelBuffer { expected: usize, actual: usize },

    #[error("failed to decode image: {0}")]
    Image(String),
}

impl From<image::ImageError> for WarpError {
    fn from(err: image::ImageError) -> Self {
        WarpError::Image(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WarpError>;
