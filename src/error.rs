//! Error types for coverage collection.

use thiserror::Error;

/// Result type alias for coverage operations
pub type Result<T> = std::result::Result<T, WgsError>;

/// Error type for coverage operations
#[derive(Error, Debug)]
pub enum WgsError {
    /// Failure reading the alignment stream or reference
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by htslib while decoding alignments
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    /// A contig named in the alignment header has no reference sequence
    #[error("Reference sequence '{contig}' not found")]
    ReferenceNotFound {
        /// The contig name
        contig: String,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// An observation could not be interpreted; the run is aborted
    #[error("Malformed observation at {position}: {reason}")]
    MalformedObservation {
        /// Locus formatted as `sequence_index:position`
        position: String,
        /// What was wrong with it
        reason: String,
    },

    /// Alignments are not in coordinate order
    #[error("Input is not coordinate-sorted: {0}")]
    UnsortedInput(String),

    /// The run was cancelled before all packs were processed
    #[error("Coverage collection was cancelled")]
    Cancelled,

    /// A worker thread panicked while processing a pack
    #[error("A worker thread panicked")]
    WorkerPanicked,

    /// A pipeline channel disconnected without an end-of-stream marker
    #[error("Channel '{0}' closed unexpectedly")]
    ChannelClosed(String),
}

impl WgsError {
    pub(crate) fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        WgsError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}
