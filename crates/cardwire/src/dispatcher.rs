//! The action dispatcher: the only path for client-initiated actions.
//!
//! Every outbound action passes two gates before a frame is built:
//!
//! 1. **Turn ownership** — `play_card` is rejected locally unless
//!    `SessionState::is_my_turn()` holds. The rejection never reaches
//!    the server.
//! 2. **Dispatch guard** — a TTL window keyed by card id swallows a
//!    second invocation for the same card (double-click protection).
//!    The window expires on the clock, not on acknowledgment, because
//!    the server does not echo a distinguishable ack quickly.
//!
//! The dispatcher never mutates hands or slots. Its only optimism is
//! the guard itself; authoritative state arrives via `game_state`.

use std::sync::Arc;
use std::time::Duration;

use cardwire_channel::ChannelManager;
use cardwire_inflight::{dispatch_key, InFlightRegistry};
use cardwire_protocol::{CardId, ClientMessage, GameId, PlayerAction};
use cardwire_session::{SessionContext, SessionError, SessionState};

use crate::api::LobbyApi;
use crate::CardwireError;

/// Default double-submission window. Long enough to absorb a
/// double-click, short enough that a genuine replay attempt after a
/// lost frame still goes through.
pub const DEFAULT_GUARD_TTL: Duration = Duration::from_millis(500);

/// Encodes and sends client-initiated actions, guarded by turn
/// ownership and the dispatch window.
pub struct ActionDispatcher {
    channel: ChannelManager,
    api: Arc<LobbyApi>,
    context: Arc<SessionContext>,
    guard: InFlightRegistry,
    guard_ttl: Duration,
}

impl ActionDispatcher {
    pub fn new(
        channel: ChannelManager,
        api: Arc<LobbyApi>,
        context: Arc<SessionContext>,
        guard_ttl: Duration,
    ) -> Self {
        Self {
            channel,
            api,
            context,
            guard: InFlightRegistry::new(),
            guard_ttl,
        }
    }

    /// Plays a card.
    ///
    /// Returns `Ok(true)` when a frame went out, `Ok(false)` when the
    /// dispatch guard swallowed a duplicate inside the window.
    ///
    /// # Errors
    /// - [`SessionError::NotYourTurn`] when the turn predicate fails;
    ///   nothing is sent and the server is not told.
    /// - Session/channel errors when the context or connection is not
    ///   usable.
    pub fn play_card(
        &mut self,
        state: &SessionState,
        card_id: CardId,
    ) -> Result<bool, CardwireError> {
        if !state.is_my_turn() {
            return Err(SessionError::NotYourTurn.into());
        }

        if !self.guard.try_begin(dispatch_key(card_id), self.guard_ttl) {
            tracing::debug!(%card_id, "duplicate play dispatch suppressed");
            return Ok(false);
        }

        let (game_id, auth_token) = self.session_params()?;
        self.channel.send(&ClientMessage::PlayerAction {
            action: PlayerAction::PlayCard { card_id },
            game_id,
            auth_token,
        })?;
        tracing::info!(%card_id, "card play dispatched");
        Ok(true)
    }

    /// Sends a chat line. Empty lines are dropped without a send.
    pub fn send_chat(&mut self, text: &str) -> Result<(), CardwireError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let (game_id, auth_token) = self.session_params()?;
        self.channel.send(&ClientMessage::ChatMessage {
            message: text.to_string(),
            game_id,
            auth_token,
        })?;
        Ok(())
    }

    /// Post-render hand-size telemetry for peers' scoreboards.
    pub fn announce_hand_size(
        &mut self,
        state: &SessionState,
    ) -> Result<(), CardwireError> {
        let (game_id, auth_token) = self.session_params()?;
        self.channel.send(&ClientMessage::PlayerHandUpdate {
            username: self.context.username().to_string(),
            card_count: state.own_hand().len(),
            game_id,
            auth_token,
        })?;
        Ok(())
    }

    /// Starts the session over HTTP, then asks for a fresh snapshot
    /// over the channel so the UI updates without a reload.
    pub async fn start_game(&mut self) -> Result<(), CardwireError> {
        let (game_id, auth_token) = self.session_params()?;
        self.api.start_game(game_id).await?;
        // The broadcast may race the acknowledgment; an explicit
        // request makes the refresh deterministic.
        let _ = self.channel.send(&ClientMessage::GameStateRequest {
            game_id,
            auth_token,
        });
        Ok(())
    }

    /// Restarts a finished session for everyone.
    pub async fn restart_game(&mut self) -> Result<(), CardwireError> {
        let (game_id, auth_token) = self.session_params()?;
        self.api.restart_game(game_id).await?;
        let _ = self.channel.send(&ClientMessage::GameStateRequest {
            game_id,
            auth_token,
        });
        Ok(())
    }

    /// Debug-only forced finish.
    pub async fn finish_game(&mut self) -> Result<(), CardwireError> {
        let (game_id, _) = self.session_params()?;
        self.api.finish_game(game_id).await?;
        Ok(())
    }

    /// Leaves for the lobby. Marks the navigation intentional (so the
    /// probe stands down and no disconnect notice fires) and, when the
    /// session is finished, broadcasts `redirect_to_lobby` so every
    /// participant leaves together.
    pub fn return_to_lobby(
        &mut self,
        state: &SessionState,
    ) -> Result<(), CardwireError> {
        self.context.mark_intentional_navigation();

        if state.phase().is_finished() && self.channel.is_open() {
            let (game_id, auth_token) = self.session_params()?;
            self.channel.send(&ClientMessage::RedirectToLobby {
                game_id,
                auth_token,
            })?;
            tracing::info!("redirect request broadcast to session");
        }
        Ok(())
    }

    fn session_params(&self) -> Result<(GameId, String), CardwireError> {
        let game_id = self
            .context
            .game_id()
            .ok_or(SessionError::NoSession)?;
        let auth_token = self
            .context
            .credential()
            .ok_or(SessionError::MissingCredential)?;
        Ok((game_id, auth_token))
    }
}
