//! Error types for slabcrate

use thiserror::Error;

/// Main error type for slabcrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("skeleton has no spheres")]
    EmptySkeleton,

    #[error("{kind} {index} references missing sphere {vertex}")]
    DanglingReference {
        kind: &'static str,
        index: usize,
        vertex: usize,
    },

    #[error("sphere {index} is invalid: {reason}")]
    InvalidSphere { index: usize, reason: &'static str },

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("skeletal graph is inconsistent: {0}")]
    Inconsistent(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

/// Result type alias for slabcrate operations
pub type Result<T> = std::result::Result<T, Error>;
