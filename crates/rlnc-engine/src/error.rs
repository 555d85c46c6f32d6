//! Engine error types.

use thiserror::Error;

/// Errors surfaced by factories and coders.
///
/// A linearly dependent payload is not an error; see
/// [`DecodeOutcome::Redundant`](crate::decoder::DecodeOutcome::Redundant).
/// Reading symbols from an incomplete decoder is not an error either; the
/// caller checks [`Decoder::is_complete`](crate::decoder::Decoder::is_complete).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodingError {
    /// Generation parameters rejected by the factory or a setter.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A symbol id was referenced before it was populated.
    #[error("symbol {index} has not been set")]
    UninitializedSymbol {
        /// The unpopulated symbol id.
        index: usize,
    },

    /// The operation is not supported by this scheme or coder.
    #[error("{operation} is not supported by the {scheme} scheme")]
    CapabilityMismatch {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Scheme of the coder it was invoked on.
        scheme: &'static str,
    },

    /// A payload, or a raw coefficient vector or symbol, does not match the
    /// coder's generation.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A feedback buffer does not match the coder's generation.
    #[error("malformed feedback: expected {expected} bytes, got {got}")]
    MalformedFeedback {
        /// Expected feedback size in bytes.
        expected: usize,
        /// Received feedback size in bytes.
        got: usize,
    },

    /// Recoding was requested before any combination is available.
    #[error("nothing to recode: the basis is empty")]
    EmptyBasis,
}

pub type Result<T> = std::result::Result<T, CodingError>;
