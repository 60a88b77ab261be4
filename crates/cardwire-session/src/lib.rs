//! Session synchronization core for Cardwire.
//!
//! This crate is the heart of the client: the authoritative local mirror
//! and the logic that keeps it synchronized with what the server
//! broadcasts.
//!
//! 1. **Context** ([`SessionContext`]) — the one explicit object holding
//!    credential, identity, session id, and navigation-intent flags.
//! 2. **State** ([`SessionState`]) — roster, hands, slots, phase, round,
//!    turn. Single writer: the router.
//! 3. **Routing** ([`MessageRouter`]) — pure state transitions; inputs
//!    are decoded messages, outputs are [`Effect`]s.
//! 4. **Ports** ([`Presenter`], [`VariantHooks`]) — the seams the
//!    surrounding application implements.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)      ← executes effects, owns the channel
//!     ↕
//! Session (this crate) ← mirrors server state, decides side effects
//!     ↕
//! Protocol (below)     ← message types, id coercion, codec
//! ```

mod context;
mod error;
mod events;
mod ports;
mod router;
mod state;

pub use context::SessionContext;
pub use error::SessionError;
pub use events::{Effect, NoticeKind, PresentationEvent};
pub use ports::{NoopHooks, Presenter, VariantHooks};
pub use router::MessageRouter;
pub use state::{Player, SessionState, SnapshotDiff};
