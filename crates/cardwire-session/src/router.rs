//! The message router: decodes protocol intent into state mutations and
//! effects.
//!
//! One `MessageRouter` exists per session. It is the *single writer* of
//! [`SessionState`]; every other component only reads. Handling a
//! message never blocks and never performs I/O — the returned
//! [`Effect`] list tells the engine what to send and what to present.
//!
//! Ordering note: the engine feeds messages in channel-delivery order,
//! but the router must not assume causal ordering between a locally sent
//! action and a later broadcast. A `turn_change` can legitimately arrive
//! before the `game_state` that reflects the action which caused it.
//! That's why snapshot handlers replace state wholesale instead of
//! patching it.

use std::sync::Arc;

use cardwire_protocol::{
    ClientMessage, GameId, PlayerAction, PlayerId, ServerMessage,
};

use crate::{
    Effect, NoticeKind, PresentationEvent, SessionContext, SessionState,
};

/// Routes inbound protocol messages into [`SessionState`] mutations and
/// presentation/reply effects.
pub struct MessageRouter {
    state: SessionState,
    context: Arc<SessionContext>,
}

impl MessageRouter {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            state: SessionState::new(),
            context,
        }
    }

    /// Read access to the mirror for dispatchers, hooks, and tests.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Installs the startup card catalog into the mirror.
    pub fn load_catalog(&mut self, cards: Vec<cardwire_protocol::Card>) {
        self.state.load_catalog(cards);
    }

    /// Handles one inbound message, mutating the mirror and returning
    /// the effects to execute, in order.
    pub fn handle(&mut self, msg: ServerMessage) -> Vec<Effect> {
        match msg {
            ServerMessage::JoinGameSuccess { game_id } => {
                self.on_join_success(game_id)
            }
            ServerMessage::GameState { game_state } => {
                self.on_game_state(&game_state)
            }
            ServerMessage::ConnectedUsers { users } => {
                self.on_connected_users(users)
            }
            ServerMessage::PlayerAction {
                player_id,
                username,
                action,
            } => self.on_player_action(player_id, username, action),
            ServerMessage::TurnChange {
                player_id,
                username,
            } => self.on_turn_change(player_id, username),
            ServerMessage::RoundResult {
                winner_name,
                card_count,
                new_round,
                ..
            } => self.on_round_result(winner_name, card_count, new_round),
            ServerMessage::GameRestart => self.on_restart(),
            ServerMessage::GameEnd {
                winner_id,
                winner_name,
            } => self.on_game_end(winner_id, winner_name),
            ServerMessage::RedirectToLobby => {
                vec![Effect::Present(PresentationEvent::NavigateToLobby)]
            }
            ServerMessage::Error { message } => {
                tracing::warn!(%message, "server rejected an action");
                vec![Effect::Present(PresentationEvent::Notice {
                    text: message,
                    kind: NoticeKind::Error,
                })]
            }
            ServerMessage::Chat {
                owner,
                message,
                avatar,
            } => {
                let own = owner == self.context.username();
                vec![Effect::Present(PresentationEvent::ChatReceived {
                    owner,
                    text: message,
                    avatar,
                    own,
                })]
            }
            ServerMessage::WarStart { war_round } => {
                vec![Effect::Present(PresentationEvent::WarStarted {
                    war_round,
                })]
            }
            ServerMessage::WarProgress { message } => {
                vec![Effect::Present(PresentationEvent::WarProgressed {
                    message,
                })]
            }
        }
    }

    // -- Handlers ---------------------------------------------------------

    fn on_join_success(&mut self, game_id: Option<GameId>) -> Vec<Effect> {
        if let Some(id) = game_id {
            // The server's idea of the session id wins.
            self.context.set_game_id(Some(id));
        }
        tracing::info!(game_id = ?self.context.game_id(), "joined session");

        // Entry granted; now pull the full picture.
        self.refresh_requests()
    }

    fn on_game_state(
        &mut self,
        snapshot: &cardwire_protocol::GameSnapshot,
    ) -> Vec<Effect> {
        let diff = self.state.apply_snapshot(snapshot);
        let mut effects = Vec::new();

        if diff.hands_replaced {
            effects.push(Effect::Present(PresentationEvent::HandChanged));
        }

        if diff.slots_replaced {
            for (player_id, card) in self.state.played_slots() {
                effects.push(Effect::Present(PresentationEvent::SlotFilled {
                    player_id: *player_id,
                    card: card.clone(),
                }));
            }
        }

        if diff.round_changed {
            effects.push(Effect::Present(PresentationEvent::SlotsCleared));
            effects.push(Effect::Present(PresentationEvent::RoundChanged {
                round: self.state.round(),
            }));
        }

        if diff.turn_changed {
            if let Some(player_id) = self.state.current_turn() {
                let username = self.username_of(player_id);
                effects.push(Effect::Present(PresentationEvent::TurnChanged {
                    player_id,
                    username,
                    mine: self.state.is_my_turn(),
                }));
            }
        }

        if diff.phase_changed {
            effects.push(Effect::Present(PresentationEvent::PhaseChanged {
                phase: self.state.phase(),
            }));
        }

        effects
    }

    fn on_connected_users(
        &mut self,
        users: Vec<cardwire_protocol::RosterEntry>,
    ) -> Vec<Effect> {
        let username = self.context.username().to_owned();
        self.state.reconcile_roster(users, &username);
        vec![Effect::Present(PresentationEvent::RosterChanged)]
    }

    /// A peer's action re-derives a presentation event only. Hands are
    /// never touched here; the authoritative hand arrives in the next
    /// `game_state`.
    fn on_player_action(
        &mut self,
        player_id: PlayerId,
        username: String,
        action: PlayerAction,
    ) -> Vec<Effect> {
        match action {
            PlayerAction::PlayCard { card_id } => {
                let Some(card) = self.state.catalog_card(card_id).cloned()
                else {
                    tracing::warn!(%card_id, "played card missing from catalog");
                    return Vec::new();
                };

                if !self.state.record_played_slot(player_id, card.clone()) {
                    // The server re-broadcasts actions around turn
                    // boundaries; a filled slot means this one was
                    // already handled.
                    tracing::debug!(
                        %player_id, %card_id,
                        "duplicate play broadcast ignored"
                    );
                    return Vec::new();
                }

                let mine = self.state.self_id() == Some(player_id);
                vec![
                    Effect::Present(PresentationEvent::SlotFilled {
                        player_id,
                        card: card.clone(),
                    }),
                    Effect::Present(PresentationEvent::CardPlayed {
                        player_id,
                        username,
                        card,
                        mine,
                    }),
                ]
            }
            PlayerAction::DrawCard => {
                vec![Effect::Present(PresentationEvent::CardDrawn {
                    player_id,
                    username,
                })]
            }
        }
    }

    fn on_turn_change(
        &mut self,
        player_id: PlayerId,
        username: String,
    ) -> Vec<Effect> {
        let moved = self.state.set_turn(player_id);
        let mine = self.state.is_my_turn();
        tracing::debug!(%player_id, mine, moved, "turn change");

        // Re-announcements still notify: the banner is how players find
        // out the server is waiting on them.
        vec![Effect::Present(PresentationEvent::TurnChanged {
            player_id,
            username,
            mine,
        })]
    }

    fn on_round_result(
        &mut self,
        winner_name: String,
        card_count: u32,
        new_round: u32,
    ) -> Vec<Effect> {
        self.state.advance_round(new_round);
        vec![
            Effect::Present(PresentationEvent::SlotsCleared),
            Effect::Present(PresentationEvent::RoundWon {
                winner_name,
                card_count,
                new_round,
            }),
        ]
    }

    fn on_restart(&mut self) -> Vec<Effect> {
        self.state.reset_for_restart();
        tracing::info!("session restarted");

        let mut effects = vec![
            Effect::Present(PresentationEvent::SlotsCleared),
            Effect::Present(PresentationEvent::HandChanged),
            Effect::Present(PresentationEvent::GameRestarted),
        ];
        // Fresh snapshot + roster, same as after a join.
        effects.extend(self.refresh_requests());
        effects
    }

    fn on_game_end(
        &mut self,
        winner_id: Option<PlayerId>,
        winner_name: String,
    ) -> Vec<Effect> {
        self.state.finish();
        vec![Effect::Present(PresentationEvent::GameEnded {
            winner_id,
            winner_name,
        })]
    }

    // -- Helpers ----------------------------------------------------------

    /// The snapshot + roster request pair sent after joining and after a
    /// restart.
    fn refresh_requests(&self) -> Vec<Effect> {
        let (Some(game_id), Some(auth_token)) =
            (self.context.game_id(), self.context.credential())
        else {
            tracing::warn!("cannot refresh: missing game id or credential");
            return Vec::new();
        };

        vec![
            Effect::Send(ClientMessage::GameStateRequest {
                game_id,
                auth_token: auth_token.clone(),
            }),
            Effect::Send(ClientMessage::ConnectedUsers {
                game_id,
                auth_token,
            }),
        ]
    }

    fn username_of(&self, player_id: PlayerId) -> String {
        self.state
            .player_by_id(player_id)
            .map(|p| p.username.clone())
            .unwrap_or_default()
    }
}

// =========================================================================
// Tests
// =========================================================================
