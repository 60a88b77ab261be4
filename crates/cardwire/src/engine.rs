//! The game client engine: everything wired together.
//!
//! `GameClient` owns one session end to end: the channel, the router,
//! the dispatcher, the lobby API, and the in-flight effect registry. Its
//! run loop is the single place where channel events become state
//! transitions and presentation calls:
//!
//! ```text
//! ChannelEvent::Frame ─decode─▶ MessageRouter ─Effects─▶ execute()
//!                                                  │
//!                     Send(frame) ◀────────────────┤
//!                     Present(event) ─▶ in-flight guard ─▶ ports
//! ```
//!
//! The in-flight registry is consulted for presentation effects only
//! (card plays and draws); protocol state updates never wait on it.

use std::sync::Arc;
use std::time::Duration;

use cardwire_channel::{
    ChannelConfig, ChannelEvent, ChannelManager,
};
use cardwire_inflight::{draw_key, play_key, InFlightRegistry};
use cardwire_protocol::{
    Card, CardId, Codec, JsonCodec, ServerMessage,
};
use cardwire_session::{
    Effect, MessageRouter, NoticeKind, PresentationEvent, Presenter,
    SessionContext, SessionError, SessionState, VariantHooks,
};
use tokio::sync::mpsc;

use crate::api::{LobbyApi, LobbyConfig};
use crate::dispatcher::{ActionDispatcher, DEFAULT_GUARD_TTL};
use crate::CardwireError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the client needs to reach its backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub channel: ChannelConfig,
    pub lobby: LobbyConfig,
    /// Double-submission window for `play_card`.
    pub dispatch_guard_ttl: Duration,
    /// In-flight window for presentation effects, sized to outlast the
    /// longest animation.
    pub effect_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            lobby: LobbyConfig::default(),
            dispatch_guard_ttl: DEFAULT_GUARD_TTL,
            effect_ttl: Duration::from_millis(1000),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One running card-game client session.
pub struct GameClient<P: Presenter, V: VariantHooks> {
    context: Arc<SessionContext>,
    channel: ChannelManager,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    router: MessageRouter,
    dispatcher: ActionDispatcher,
    api: Arc<LobbyApi>,
    codec: JsonCodec,
    effects: InFlightRegistry,
    effect_ttl: Duration,
    presenter: P,
    hooks: V,
    /// One-shot latch for lobby navigation.
    navigation_pending: bool,
}

impl<P: Presenter, V: VariantHooks> GameClient<P, V> {
    pub fn new(
        config: ClientConfig,
        context: Arc<SessionContext>,
        presenter: P,
        hooks: V,
    ) -> Self {
        let (channel, events) =
            ChannelManager::new(config.channel, Arc::clone(&context));
        let api = Arc::new(LobbyApi::new(
            config.lobby,
            Arc::clone(&context),
        ));
        channel.set_disconnect_notice(Box::new(api.beacon()));

        let dispatcher = ActionDispatcher::new(
            channel.clone(),
            Arc::clone(&api),
            Arc::clone(&context),
            config.dispatch_guard_ttl,
        );

        Self {
            router: MessageRouter::new(Arc::clone(&context)),
            context,
            channel,
            events,
            dispatcher,
            api,
            codec: JsonCodec,
            effects: InFlightRegistry::new(),
            effect_ttl: config.effect_ttl,
            presenter,
            hooks,
            navigation_pending: false,
        }
    }

    /// Read access to the state mirror.
    pub fn state(&self) -> &SessionState {
        self.router.state()
    }

    /// The lobby API, for flows the engine doesn't drive itself
    /// (listing, creating, joining sessions).
    pub fn api(&self) -> &Arc<LobbyApi> {
        &self.api
    }

    // -- Startup ----------------------------------------------------------

    /// Full startup sequence: resolve the session, fetch the catalog,
    /// connect, start the liveness probe.
    ///
    /// # Errors
    /// [`SessionError::NoSession`] when the user is in no game at all;
    /// the caller should redirect to the lobby instead of retrying.
    pub async fn startup(&mut self) -> Result<(), CardwireError> {
        if self.context.game_id().is_none() {
            match self.api.active_game().await? {
                Some(id) => self.context.set_game_id(Some(id)),
                None => return Err(SessionError::NoSession.into()),
            }
        }

        let cards = self.api.fetch_cards().await?;
        self.load_catalog(cards);

        self.connect().await?;
        self.channel.spawn_probe();

        // Arriving on the session page consumes any navigation intent
        // set by the page that sent us here.
        self.context.clear_navigation_flags();
        Ok(())
    }

    /// Installs the card catalog and flips the readiness flag the
    /// channel's join poller waits on.
    pub fn load_catalog(&mut self, cards: Vec<Card>) {
        self.router.load_catalog(cards);
        self.context.mark_ready();
    }

    /// Connects the channel without the rest of the startup sequence.
    pub async fn connect(&mut self) -> Result<(), CardwireError> {
        self.channel.connect().await.map_err(Into::into)
    }

    // -- Run loop ---------------------------------------------------------

    /// Runs startup and then processes channel events until the
    /// channel manager goes away.
    pub async fn run(&mut self) -> Result<(), CardwireError> {
        self.startup().await?;
        self.process_events().await;
        Ok(())
    }

    /// The event loop alone, for embedders that drive startup
    /// themselves.
    pub async fn process_events(&mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }
    }

    /// Processes one channel event. Public so embedders and tests can
    /// drive the loop themselves.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                tracing::info!("channel open");
            }
            ChannelEvent::Frame(bytes) => self.on_frame(&bytes),
            ChannelEvent::Closed { expected } => {
                tracing::info!(expected, "channel closed");
                if !expected {
                    // Unexpected loss: back to authentication while the
                    // probe keeps trying in the background.
                    self.presenter.navigate_to_login();
                }
            }
        }
    }

    fn on_frame(&mut self, bytes: &[u8]) {
        let msg: ServerMessage = match self.codec.decode(bytes) {
            Ok(msg) => msg,
            Err(e) => {
                // Malformed frames are dropped; the stream continues.
                tracing::warn!(error = %e, "dropping undecodable frame");
                return;
            }
        };

        tracing::debug!(?msg, "frame routed");
        let effects = self.router.handle(msg);
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(msg) => {
                    if let Err(e) = self.channel.send(&msg) {
                        tracing::warn!(error = %e, "reply send failed");
                    }
                }
                Effect::Present(event) => self.present(event),
            }
        }
    }

    fn present(&mut self, event: PresentationEvent) {
        match event {
            PresentationEvent::ChatReceived {
                owner,
                text,
                avatar,
                own,
            } => {
                self.presenter.append_chat(
                    &owner,
                    &text,
                    avatar.as_deref(),
                    own,
                );
            }

            PresentationEvent::RosterChanged => {
                self.hooks.render_roster(self.router.state());
                self.hooks.refresh_scoreboard(self.router.state());
            }

            PresentationEvent::HandChanged => {
                self.presenter.refresh_hand(self.router.state());
                self.hooks.refresh_scoreboard(self.router.state());
                // Post-render telemetry; best-effort.
                if let Err(e) =
                    self.dispatcher.announce_hand_size(self.router.state())
                {
                    tracing::debug!(error = %e, "hand-size update skipped");
                }
            }

            PresentationEvent::SlotFilled { player_id, card } => {
                self.hooks.render_slot(player_id, &card, self.router.state());
            }

            PresentationEvent::SlotsCleared => {
                self.hooks.clear_slots();
            }

            PresentationEvent::RoundChanged { round } => {
                self.presenter.show_round(round);
            }

            PresentationEvent::TurnChanged {
                player_id,
                username,
                mine,
            } => {
                self.hooks.highlight_turn(player_id, self.router.state());
                self.presenter.show_turn(&username, mine);
                if mine {
                    self.presenter.refresh_hand(self.router.state());
                }
            }

            PresentationEvent::PhaseChanged { phase } => {
                self.presenter.show_phase(phase);
            }

            PresentationEvent::RoundWon {
                winner_name,
                card_count,
                ..
            } => {
                self.presenter.show_notice(
                    &format!(
                        "{winner_name} wins the round and takes \
                         {card_count} cards!"
                    ),
                    NoticeKind::Winner,
                );
                self.hooks.refresh_scoreboard(self.router.state());
            }

            PresentationEvent::GameRestarted => {
                self.presenter
                    .show_notice("Game restarted!", NoticeKind::Info);
                self.presenter.show_phase(self.router.state().phase());
            }

            PresentationEvent::GameEnded {
                winner_id,
                winner_name,
            } => {
                self.presenter.show_results(
                    winner_id,
                    &winner_name,
                    self.router.state(),
                );
            }

            PresentationEvent::CardPlayed {
                player_id,
                username,
                card,
                mine,
            } => {
                // One visual effect per logical play: a late duplicate
                // broadcast inside the window renders nothing.
                let key = play_key(player_id, card.id);
                if self.effects.try_begin(key, self.effect_ttl) {
                    self.hooks.animate_play(player_id, &card, mine);
                    self.presenter.show_notice(
                        &format!("{username} played a card"),
                        NoticeKind::Info,
                    );
                }
            }

            PresentationEvent::CardDrawn {
                player_id,
                username,
            } => {
                if self
                    .effects
                    .try_begin(draw_key(player_id), self.effect_ttl)
                {
                    self.presenter.show_notice(
                        &format!("{username} drew a card"),
                        NoticeKind::Info,
                    );
                }
            }

            PresentationEvent::Notice { text, kind } => {
                self.presenter.show_notice(&text, kind);
            }

            PresentationEvent::NavigateToLobby => {
                // One-shot: ignored when a navigation is already
                // pending for any reason.
                if self.navigation_pending
                    || self.context.is_intentional_navigation()
                {
                    tracing::debug!("lobby redirect ignored, already pending");
                    return;
                }
                self.navigation_pending = true;
                self.context.mark_intentional_navigation();
                self.presenter.navigate_to_lobby();
            }

            PresentationEvent::WarStarted { war_round } => {
                self.hooks.on_war_start(war_round);
            }

            PresentationEvent::WarProgressed { message } => {
                self.hooks.on_war_progress(&message);
                self.hooks.refresh_scoreboard(self.router.state());
            }
        }
    }

    // -- Actions ----------------------------------------------------------

    /// Plays a card, guarded by turn ownership and the dispatch window.
    /// `Ok(false)` means a duplicate was swallowed.
    pub fn play_card(
        &mut self,
        card_id: CardId,
    ) -> Result<bool, CardwireError> {
        self.dispatcher.play_card(self.router.state(), card_id)
    }

    pub fn send_chat(&mut self, text: &str) -> Result<(), CardwireError> {
        self.dispatcher.send_chat(text)
    }

    pub async fn start_game(&mut self) -> Result<(), CardwireError> {
        self.dispatcher.start_game().await
    }

    pub async fn restart_game(&mut self) -> Result<(), CardwireError> {
        self.dispatcher.restart_game().await
    }

    /// Debug-only forced finish.
    pub async fn finish_game(&mut self) -> Result<(), CardwireError> {
        self.dispatcher.finish_game().await
    }

    /// Leaves for the lobby, broadcasting the shared redirect when the
    /// session is finished.
    pub fn return_to_lobby(&mut self) -> Result<(), CardwireError> {
        self.dispatcher.return_to_lobby(self.router.state())?;
        self.navigation_pending = true;
        self.presenter.navigate_to_lobby();
        Ok(())
    }

    // -- Teardown ---------------------------------------------------------

    /// Tears the session down: cancels the probe and any in-flight
    /// effect guards, and sends the disconnect notices unless the
    /// context marks the navigation as intentional.
    pub async fn shutdown(&mut self) {
        let intentional = self.context.is_intentional_navigation();
        self.channel.shutdown(intentional).await;
        self.effects.clear();
    }
}
