//! Error types for the Stowage core.

/// Core error type for Stowage infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum StowageError {
    /// Invalid AWS account ID format.
    #[error("invalid AWS account ID: {0} (must be 12-digit numeric string)")]
    InvalidAccountId(String),

    /// Invalid AWS region identifier.
    #[error("invalid AWS region: {0:?}")]
    InvalidRegion(String),
}
