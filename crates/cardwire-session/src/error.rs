//! Error types for the session layer.

/// Errors raised while mediating session actions.
///
/// Turn violations deliberately stay local: they are rejected before any
/// frame is built and never reported to the server.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No credential token is available; authentication is required
    /// before the session can do anything.
    #[error("authentication required: no credential token")]
    MissingCredential,

    /// No session id is known (not joined, or storage was cleared).
    #[error("no active session")]
    NoSession,

    /// The local player attempted to act out of turn.
    #[error("not this player's turn")]
    NotYourTurn,

    /// The acting player's id has not been derived from the roster yet.
    #[error("local player id not established")]
    UnknownSelf,
}
