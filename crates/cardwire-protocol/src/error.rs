//! Error types for the protocol layer.
//!
//! Each crate in Cardwire defines its own error enum, so a
//! `ProtocolError` always means a serialization problem, never a
//! networking or state one.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed. Common causes: malformed JSON, an
    /// unknown `type` tag, a non-numeric id, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates a protocol rule, e.g. a
    /// `game_state` whose snapshot references no session.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
