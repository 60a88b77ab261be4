//! Error types for the channel layer.

use cardwire_protocol::ProtocolError;

/// Errors that can occur while managing the session channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No credential token is present; the connection is not attempted
    /// and the caller should run the authentication flow.
    #[error("authentication required: no credential token")]
    AuthRequired,

    /// Establishing the WebSocket failed.
    #[error("connect failed: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be encoded before sending.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Sending was attempted while the channel is not open.
    #[error("channel is not open")]
    NotConnected,
}
