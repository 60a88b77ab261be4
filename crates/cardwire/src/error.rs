//! Unified error type for the Cardwire client.

use cardwire_channel::ChannelError;
use cardwire_protocol::ProtocolError;
use cardwire_session::SessionError;

use crate::api::ApiError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically. Nothing in the engine
/// lets one of these escape the run loop; user-visible failures surface
/// as transient notices instead.
#[derive(Debug, thiserror::Error)]
pub enum CardwireError {
    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (missing credential, turn violation).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A channel-level error (connect, send, auth required).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A lobby endpoint error (HTTP transport or status).
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error() {
        let err: CardwireError = SessionError::NotYourTurn.into();
        assert!(matches!(err, CardwireError::Session(_)));
        assert!(err.to_string().contains("turn"));
    }

    #[test]
    fn test_from_channel_error() {
        let err: CardwireError = ChannelError::AuthRequired.into();
        assert!(matches!(err, CardwireError::Channel(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: CardwireError =
            ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, CardwireError::Protocol(_)));
    }
}
