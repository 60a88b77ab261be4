//! Wire protocol for Cardwire.
//!
//! This crate defines the "language" the card-game client and its server
//! speak over the session channel:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`GameSnapshot`],
//!   [`Card`], identity newtypes) — the structures that travel as JSON
//!   text frames.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! The protocol layer knows nothing about connections, session state, or
//! presentation. It sits between the channel (raw frames) and the router
//! (state transitions):
//!
//! ```text
//! Channel (frames) → Protocol (ServerMessage) → Router (SessionState)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Card, CardId, ClientMessage, GameId, GameSnapshot, Phase, PlayerAction,
    PlayerId, RosterEntry, ServerMessage,
};
