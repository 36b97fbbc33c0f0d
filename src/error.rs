//! Error types for admission dispatch.
//!
//! Every error here ends up as a denial reason: the dispatcher never returns
//! an `Err` to its caller, it converts the error with `Display` instead.

use thiserror::Error;

use crate::webhooks::decoder::DecodeError;

/// Error type for admission dispatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// An object payload could not be decoded
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// A payload arrived before any decoder was injected
    #[error("no decoder configured")]
    MissingDecoder,

    /// The review body could not be turned into a request
    #[error("Invalid AdmissionReview: {0}")]
    InvalidReview(String),

    /// A handler returned a patch that is not a JSON Patch document
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error was caused by the request payload itself
    /// rather than by how the dispatcher was configured.
    pub fn is_bad_request(&self) -> bool {
        match self {
            Error::Decode(_) | Error::InvalidReview(_) | Error::Serialization(_) => true,
            Error::MissingDecoder | Error::InvalidPatch(_) => false,
        }
    }
}

/// Result type alias for admission dispatch operations
pub type Result<T> = std::result::Result<T, Error>;
