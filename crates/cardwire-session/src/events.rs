//! Router outputs: presentation events and outbound replies.
//!
//! The router is a pure state-transition core. It never performs I/O and
//! never calls into presentation directly; instead each handled message
//! yields a list of [`Effect`]s that the engine executes — replies go out
//! over the channel, presentation events go to the ports (after the
//! in-flight registry has had its say for animated ones).

use cardwire_protocol::{Card, ClientMessage, Phase, PlayerId};

/// One side effect requested by the router.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a frame over the session channel.
    Send(ClientMessage),
    /// Notify the presentation layer.
    Present(PresentationEvent),
}

/// Severity/styling hint for transient notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
    Winner,
    War,
}

/// A presentation-layer event derived from protocol traffic.
///
/// Events that re-derive a peer's visual effect ([`CardPlayed`],
/// [`CardDrawn`]) carry everything needed to build an in-flight key, so
/// the engine can suppress a duplicate effect for an event already
/// rendered through an optimistic local path.
///
/// [`CardPlayed`]: PresentationEvent::CardPlayed
/// [`CardDrawn`]: PresentationEvent::CardDrawn
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// A chat line arrived. `own` marks the local player's lines.
    ChatReceived {
        owner: String,
        text: String,
        avatar: Option<String>,
        own: bool,
    },

    /// The roster changed; hooks re-render from `SessionState`.
    RosterChanged,

    /// The local hand was replaced by a snapshot.
    HandChanged,

    /// A face-up slot gained a card.
    SlotFilled { player_id: PlayerId, card: Card },

    /// All face-up slots cleared (round boundary or restart).
    SlotsCleared,

    /// The round counter moved (snapshot diff).
    RoundChanged { round: u32 },

    /// Turn ownership moved (or was re-announced).
    TurnChanged {
        player_id: PlayerId,
        username: String,
        mine: bool,
    },

    /// The session phase changed.
    PhaseChanged { phase: Phase },

    /// A round concluded.
    RoundWon {
        winner_name: String,
        card_count: u32,
        new_round: u32,
    },

    /// The session was reset to `waiting`.
    GameRestarted,

    /// The session ended; show the results summary.
    GameEnded {
        winner_id: Option<PlayerId>,
        winner_name: String,
    },

    /// A peer played a card; animate it into their slot.
    CardPlayed {
        player_id: PlayerId,
        username: String,
        card: Card,
        mine: bool,
    },

    /// A peer drew a card.
    CardDrawn { player_id: PlayerId, username: String },

    /// Transient, non-modal notice.
    Notice { text: String, kind: NoticeKind },

    /// One-shot navigation back to the lobby. Idempotent at the engine:
    /// ignored when a navigation is already pending.
    NavigateToLobby,

    /// Variant stream: forced-equal-value continuation began.
    WarStarted { war_round: u32 },

    /// Variant stream: continuation progress text.
    WarProgressed { message: String },
}
