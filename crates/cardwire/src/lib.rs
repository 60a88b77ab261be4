//! # Cardwire
//!
//! Client engine for server-authoritative, turn-based multiplayer card
//! games. Cardwire keeps a local mirror of server state synchronized
//! over a persistent channel, mediates player actions and turn
//! ownership, and guards presentation against duplicate effects — while
//! rendering itself stays behind two small ports the application
//! implements.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cardwire::prelude::*;
//!
//! struct MyTable;
//! impl VariantHooks for MyTable {}
//! impl Presenter for MyTable {}
//!
//! # async fn run() -> Result<(), CardwireError> {
//! let context = Arc::new(
//!     SessionContext::new("alice").with_credential("token"),
//! );
//! let mut client = GameClient::new(
//!     ClientConfig::default(),
//!     context,
//!     MyTable,
//!     MyTable,
//! );
//! client.run().await
//! # }
//! ```

mod api;
mod dispatcher;
mod engine;
mod error;

pub use api::{ApiError, GameSummary, LobbyApi, LobbyBeacon, LobbyConfig};
pub use dispatcher::{ActionDispatcher, DEFAULT_GUARD_TTL};
pub use engine::{ClientConfig, GameClient};
pub use error::CardwireError;

/// The common imports for building a client on Cardwire.
pub mod prelude {
    pub use crate::{
        CardwireError, ClientConfig, GameClient, LobbyConfig,
    };
    pub use cardwire_channel::{ChannelConfig, ChannelEvent, ChannelState};
    pub use cardwire_protocol::{
        Card, CardId, GameId, Phase, PlayerId,
    };
    pub use cardwire_session::{
        NoticeKind, Presenter, SessionContext, SessionState, VariantHooks,
    };
}
