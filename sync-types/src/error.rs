//! Error types for keepsync wire types.

use thiserror::Error;

/// Errors that can occur while encoding or parsing keepsync wire types.
#[derive(Debug, Error)]
pub enum WireError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Envelope version this build cannot read
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// Invalid identifier text
    #[error("invalid {kind}: {reason}")]
    InvalidId {
        /// Which identifier failed to parse.
        kind: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
