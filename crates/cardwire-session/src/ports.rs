//! Presentation ports: the seams between the engine and whatever draws.
//!
//! Rendering is out of scope for the engine. Instead of hard-coding
//! visual construction into the protocol handlers, the engine calls
//! these two traits at well-defined points:
//!
//! - [`Presenter`] — the generic presentation surface every ruleset
//!   needs: notices, chat, turn banner, phase/round indicators, results.
//! - [`VariantHooks`] — the capability set a specific ruleset supplies
//!   to specialize slot layout, turn highlighting, the roster view, and
//!   the scoreboard, without touching protocol logic.
//!
//! Every method defaults to a no-op, so a variant only implements what
//! it actually renders. `Send` because the engine may run the dispatch
//! loop on a runtime worker thread.

use cardwire_protocol::{Card, Phase, PlayerId};

use crate::{NoticeKind, SessionState};

/// Generic presentation surface. Implemented by the surrounding
/// application (a DOM layer, a TUI, a test recorder).
pub trait Presenter: Send {
    /// Show a transient, non-modal notice.
    fn show_notice(&mut self, _text: &str, _kind: NoticeKind) {}

    /// Append a chat line to the transient display list.
    fn append_chat(
        &mut self,
        _owner: &str,
        _text: &str,
        _avatar: Option<&str>,
        _own: bool,
    ) {
    }

    /// The local hand was replaced; re-render it from the state.
    fn refresh_hand(&mut self, _state: &SessionState) {}

    /// Announce whose turn it is. `mine` selects the "your turn"
    /// wording and enables the hand's affordances.
    fn show_turn(&mut self, _username: &str, _mine: bool) {}

    /// The session phase changed.
    fn show_phase(&mut self, _phase: Phase) {}

    /// The round counter changed.
    fn show_round(&mut self, _round: u32) {}

    /// The session ended; render the results summary.
    fn show_results(
        &mut self,
        _winner_id: Option<PlayerId>,
        _winner_name: &str,
        _state: &SessionState,
    ) {
    }

    /// Navigate back to the lobby. Called at most once per session; the
    /// engine swallows repeats.
    fn navigate_to_lobby(&mut self) {}

    /// Return to the authentication flow after an unexpected
    /// connection loss.
    fn navigate_to_login(&mut self) {}
}

/// Capability set supplied by a specific ruleset.
///
/// The engine calls these after roster reconciliation, after turn
/// changes, and around round boundaries. A ruleset substitutes its own
/// implementation (e.g. a two-player face-off layout with a
/// forced-equal-value continuation sub-phase) while the protocol and
/// state machinery stay shared.
pub trait VariantHooks: Send {
    /// Render a face-up card into the given player's slot.
    fn render_slot(
        &mut self,
        _player_id: PlayerId,
        _card: &Card,
        _state: &SessionState,
    ) {
    }

    /// Animate a card-play effect. Called at most once per logical
    /// play event; the engine's in-flight registry swallows duplicates.
    fn animate_play(&mut self, _player_id: PlayerId, _card: &Card, _mine: bool) {
    }

    /// Clear every face-up slot (round boundary, restart).
    fn clear_slots(&mut self) {}

    /// Highlight the player who owns the turn.
    fn highlight_turn(&mut self, _player_id: PlayerId, _state: &SessionState) {}

    /// Re-render the participant list after reconciliation.
    fn render_roster(&mut self, _state: &SessionState) {}

    /// Refresh the scoreboard (hand sizes, round counter).
    fn refresh_scoreboard(&mut self, _state: &SessionState) {}

    /// The forced-equal-value continuation sub-phase began.
    fn on_war_start(&mut self, _war_round: u32) {}

    /// Progress text for the continuation sub-phase.
    fn on_war_progress(&mut self, _message: &str) {}
}

/// A hook set that renders nothing. Useful for headless runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl VariantHooks for NoopHooks {}
impl Presenter for NoopHooks {}
