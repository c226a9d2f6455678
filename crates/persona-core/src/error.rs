//! Error types for the avatar core

use thiserror::Error;

use crate::NodeId;

/// Core avatar errors
///
/// Acquisition errors are recoverable: the pipeline advances to the next
/// candidate and finally to the procedural fallback. They are only
/// observable through the building blocks that produce them.
#[derive(Error, Debug)]
pub enum PersonaError {
    // Loader errors
    #[error("Loader source unavailable: {location}: {reason}")]
    LoaderUnavailable { location: String, reason: String },

    #[error("No loader source could be resolved")]
    NoLoaderResolved,

    // Asset errors
    #[error("Asset probe failed for {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Asset fetch failed for {path}: {reason}")]
    FetchFailed { path: String, reason: String },

    #[error("Asset decode failed for {path}: {reason}")]
    DecodeFailed { path: String, reason: String },

    #[error("All {0} asset candidates failed")]
    CandidatesExhausted(usize),

    // Scene errors
    #[error("Stale node handle: {0:?}")]
    StaleNode(NodeId),

    #[error("Acquisition superseded: ticket generation {ticket}, avatar generation {current}")]
    AcquisitionSuperseded { ticket: u64, current: u64 },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for avatar operations
pub type PersonaResult<T> = Result<T, PersonaError>;

impl PersonaError {
    /// Whether the acquisition pipeline may move on to the next candidate
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PersonaError::InvalidConfig(_))
    }
}
