//! Error types for the sketch core.

use std::io;
use thiserror::Error;

/// Errors raised by vector math, configuration and simulation ticks.
#[derive(Error, Debug)]
pub enum SketchError {
    /// A zero-length vector was asked to change its length.
    #[error("cannot rescale a zero-length vector")]
    DegenerateVector,

    /// Configuration rejected at initialization.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A color string that is not `#RRGGBB` or `#RRGGBBAA`.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// IO error when reading a config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error
    #[error("config parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SketchError>;

pub(crate) fn invalid(message: impl Into<String>) -> SketchError {
    SketchError::InvalidConfiguration(message.into())
}
