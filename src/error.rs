//! Errors raised immediately instead of being collected as diagnostics

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Unknown transformation type: {0}")]
    UnknownTransformation(String),

    #[error("Scale factors must be finite and greater than zero, got ({0}, {1})")]
    InvalidScale(f64, f64),

    #[error("Parameter `{0}` must be a finite number")]
    NonFiniteParameter(&'static str),

    #[error("Precision {0} is larger than the maximum of {max}", max = MAX_PRECISION)]
    InvalidPrecision(u8),

    #[error("Operation `{0}` needs a viewBox")]
    MissingViewBox(&'static str),

    #[error("Invalid options: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to read configuration {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Highest decimal precision the coordinate rounding pass accepts
pub const MAX_PRECISION: u8 = 10;

/// Failure reported by an external renderer, carried through untouched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
