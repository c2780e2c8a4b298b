//! Error types for the diagnostics overlay.

use thiserror::Error;

/// Errors that can occur in the overlay.
///
/// Ingestion calls never return these; they surface from configuration,
/// slot bookkeeping and subscriber callbacks only.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The configuration is not usable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A slot id does not belong to the ring buffer.
    #[error("unknown slot: {0}")]
    UnknownSlot(usize),

    /// The slot exists but is not currently displayed.
    #[error("slot {0} is not active")]
    SlotInactive(usize),

    /// A subscriber callback reported a failure.
    #[error("subscriber failed: {0}")]
    Subscriber(String),

    /// Config deserialization failed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for overlay operations.
pub type Result<T> = std::result::Result<T, OverlayError>;
