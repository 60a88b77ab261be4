//! Persistent session channel for Cardwire.
//!
//! One [`ChannelManager`] exists per session. It owns the WebSocket,
//! reports inbound frames and lifecycle changes as [`ChannelEvent`]s,
//! runs the liveness probe that keeps the connection alive across
//! transient network loss, and handles graceful vs. ungraceful
//! teardown according to the context's navigation-intent flags.
//!
//! The channel knows nothing about game state: it moves frames. The
//! engine above it owns decoding and routing.

mod error;
mod manager;

pub use error::ChannelError;
pub use manager::{
    ChannelConfig, ChannelEvent, ChannelManager, ChannelState,
    DisconnectNotice,
};
