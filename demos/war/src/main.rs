//! Two-player "War" client built on the Cardwire engine.
//!
//! War is the elimination variant: each round both players reveal one
//! card, the higher value takes both, and equal values force the "war"
//! continuation sub-phase (face-down card, then face-up) until someone
//! wins the pile. All of that is decided server-side; this binary only
//! supplies the two-seat presentation — slots, scoreboard, war-mode
//! styling — through the engine's ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cardwire::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// Where a card lands in the two-seat face-off layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Seat {
    /// The local player's slot.
    Bottom,
    /// The opponent's slot.
    Top,
}

impl Seat {
    fn label(self) -> &'static str {
        match self {
            Self::Bottom => "you",
            Self::Top => "opponent",
        }
    }
}

/// Exactly two connected players may start a War session.
fn can_start(state: &SessionState) -> bool {
    state.players().iter().filter(|p| p.connected).count() == 2
}

// ---------------------------------------------------------------------------
// Variant hooks
// ---------------------------------------------------------------------------

/// The War table: two slots, a scoreboard of card counts, and the
/// war-mode flag for the continuation sub-phase.
struct WarTable {
    slots: HashMap<Seat, Card>,
    scoreboard: Vec<(String, usize)>,
    round: u32,
    war_mode: bool,
    highlighted: Option<PlayerId>,
    /// Raised while both seats are taken and the table hasn't started;
    /// the bootstrap watches it to trigger the start call.
    startable: Arc<AtomicBool>,
}

impl WarTable {
    fn new(startable: Arc<AtomicBool>) -> Self {
        Self {
            slots: HashMap::new(),
            scoreboard: Vec::new(),
            round: 1,
            war_mode: false,
            highlighted: None,
            startable,
        }
    }

    fn seat_for(player_id: PlayerId, state: &SessionState) -> Seat {
        if state.self_id() == Some(player_id) {
            Seat::Bottom
        } else {
            Seat::Top
        }
    }
}

impl VariantHooks for WarTable {
    fn render_slot(
        &mut self,
        player_id: PlayerId,
        card: &Card,
        state: &SessionState,
    ) {
        let seat = Self::seat_for(player_id, state);
        println!(
            "[table] {}: {} of {}",
            seat.label(),
            card.rank,
            card.suit
        );
        self.slots.insert(seat, card.clone());
    }

    fn animate_play(&mut self, player_id: PlayerId, card: &Card, mine: bool) {
        let style = if self.war_mode { "war card" } else { "card" };
        tracing::debug!(%player_id, card = %card.id, mine, style, "play effect");
    }

    fn clear_slots(&mut self) {
        self.slots.clear();
        // A cleared table also ends any running war display.
        self.war_mode = false;
        println!("[table] slots cleared");
    }

    fn highlight_turn(&mut self, player_id: PlayerId, state: &SessionState) {
        self.highlighted = Some(player_id);
        let seat = Self::seat_for(player_id, state);
        println!("[table] waiting on {}", seat.label());
    }

    fn render_roster(&mut self, state: &SessionState) {
        for player in state.players() {
            let mark = if player.connected { "" } else { " (disconnected)" };
            println!("[roster] {}{mark}", player.username);
        }
        self.startable.store(
            can_start(state) && state.phase() == Phase::Waiting,
            Ordering::SeqCst,
        );
    }

    fn refresh_scoreboard(&mut self, state: &SessionState) {
        self.round = state.round();
        self.scoreboard = state
            .players()
            .iter()
            .filter_map(|p| {
                p.id.map(|id| (p.username.clone(), state.hand_size(id)))
            })
            .collect();

        let line = self
            .scoreboard
            .iter()
            .map(|(name, cards)| format!("{name}: {cards} cards"))
            .collect::<Vec<_>>()
            .join(" | ");
        println!("[score] round {} — {line}", self.round);
    }

    fn on_war_start(&mut self, war_round: u32) {
        self.war_mode = true;
        println!(
            "[table] WAR! (round {war_round}) — equal values, each player \
             puts one card face down and one face up"
        );
    }

    fn on_war_progress(&mut self, message: &str) {
        println!("[table] {message}");
    }
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Console presentation: notices, chat, hand, results.
struct Console {
    username: String,
}

impl Presenter for Console {
    fn show_notice(&mut self, text: &str, kind: NoticeKind) {
        println!("[{kind:?}] {text}");
    }

    fn append_chat(
        &mut self,
        owner: &str,
        text: &str,
        _avatar: Option<&str>,
        own: bool,
    ) {
        let owner = if own { "me" } else { owner };
        println!("[chat] {owner}: {text}");
    }

    fn refresh_hand(&mut self, state: &SessionState) {
        let hand = state
            .own_hand()
            .iter()
            .map(|c| format!("{} of {}", c.rank, c.suit))
            .collect::<Vec<_>>()
            .join(", ");
        println!("[hand] {hand}");
    }

    fn show_turn(&mut self, username: &str, mine: bool) {
        if mine {
            println!("[turn] it's your turn!");
        } else {
            println!("[turn] it's {username}'s turn");
        }
    }

    fn show_phase(&mut self, phase: Phase) {
        println!("[phase] {phase}");
    }

    fn show_round(&mut self, round: u32) {
        println!("[round] {round}");
    }

    fn show_results(
        &mut self,
        _winner_id: Option<PlayerId>,
        winner_name: &str,
        state: &SessionState,
    ) {
        println!("[results] game over — {winner_name} wins!");
        for player in state.players() {
            let cards = player
                .id
                .map(|id| state.hand_size(id))
                .unwrap_or_default();
            println!("[results] {}: {cards} cards", player.username);
        }
    }

    fn navigate_to_lobby(&mut self) {
        println!("[nav] back to the lobby ({})", self.username);
    }

    fn navigate_to_login(&mut self) {
        println!("[nav] connection lost, back to login");
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let username = env_or("CARDWIRE_USERNAME", "player");
    let token = std::env::var("CARDWIRE_TOKEN")
        .map_err(|_| "CARDWIRE_TOKEN must be set (credential token)")?;

    let context = Arc::new(
        SessionContext::new(username.clone()).with_credential(token),
    );
    if let Ok(raw) = std::env::var("CARDWIRE_GAME_ID") {
        let id: u64 = raw.parse()?;
        context.set_game_id(Some(GameId(id)));
    }

    let config = ClientConfig {
        channel: ChannelConfig {
            endpoint: env_or("CARDWIRE_WS_URL", "ws://localhost:3000"),
            ..ChannelConfig::default()
        },
        lobby: LobbyConfig {
            base_url: env_or("CARDWIRE_API_URL", "http://localhost:3000"),
        },
        ..ClientConfig::default()
    };

    let startable = Arc::new(AtomicBool::new(false));
    let mut client = GameClient::new(
        config,
        Arc::clone(&context),
        Console { username },
        WarTable::new(Arc::clone(&startable)),
    );

    eprintln!("joining war table as {}", context.username());
    client.startup().await?;

    // The start button, headless: once the roster shows both seats
    // taken, ask the server to deal.
    let api = Arc::clone(client.api());
    let start_context = Arc::clone(&context);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            if !startable.swap(false, Ordering::SeqCst) {
                continue;
            }
            let Some(game_id) = start_context.game_id() else {
                continue;
            };
            match api.start_game(game_id).await {
                Ok(()) => tracing::info!(%game_id, "start requested"),
                Err(e) => tracing::warn!(error = %e, "start failed"),
            }
        }
    });

    client.process_events().await;
    Ok(())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cardwire_protocol::{GameSnapshot, RosterEntry};
    use std::collections::HashMap as Map;

    fn entry(username: &str, id: u64) -> RosterEntry {
        RosterEntry {
            id: Some(PlayerId(id)),
            username: username.into(),
            connected: true,
            avatar: None,
        }
    }

    fn card(id: u32, rank: &str) -> Card {
        Card {
            id: CardId(id),
            rank: rank.into(),
            suit: "clubs".into(),
            image: format!("cards/{id}.png"),
        }
    }

    fn table() -> WarTable {
        WarTable::new(Arc::new(AtomicBool::new(false)))
    }

    /// Two-player state with alice (self, id 1) and bob (id 2).
    fn two_player_state() -> SessionState {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("alice", 1), entry("bob", 2)], "alice");
        state
    }

    // =====================================================================
    // can_start()
    // =====================================================================

    #[test]
    fn test_can_start_requires_exactly_two_players() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("alice", 1)], "alice");
        assert!(!can_start(&state));

        state.reconcile_roster(vec![entry("alice", 1), entry("bob", 2)], "alice");
        assert!(can_start(&state));
    }

    #[test]
    fn test_can_start_ignores_disconnected_players() {
        let mut state = two_player_state();
        // Bob drops off the roster: still tracked, but not startable.
        state.reconcile_roster(vec![entry("alice", 1)], "alice");
        assert!(!can_start(&state));
    }

    #[test]
    fn test_can_start_rejects_three_players() {
        let mut state = SessionState::new();
        state.reconcile_roster(
            vec![entry("a", 1), entry("b", 2), entry("c", 3)],
            "a",
        );
        assert!(!can_start(&state));
    }

    // =====================================================================
    // Seats + slots
    // =====================================================================

    #[test]
    fn test_own_cards_land_in_bottom_seat() {
        let state = two_player_state();
        let mut table = table();

        table.render_slot(PlayerId(1), &card(5, "9"), &state);
        table.render_slot(PlayerId(2), &card(18, "king"), &state);

        assert_eq!(table.slots[&Seat::Bottom].id, CardId(5));
        assert_eq!(table.slots[&Seat::Top].id, CardId(18));
    }

    #[test]
    fn test_clear_slots_empties_table_and_ends_war() {
        let state = two_player_state();
        let mut table = table();
        table.render_slot(PlayerId(1), &card(5, "9"), &state);
        table.on_war_start(1);

        table.clear_slots();

        assert!(table.slots.is_empty());
        assert!(!table.war_mode);
    }

    // =====================================================================
    // War mode
    // =====================================================================

    #[test]
    fn test_war_start_toggles_war_mode() {
        let mut table = table();
        assert!(!table.war_mode);
        table.on_war_start(2);
        assert!(table.war_mode);
    }

    // =====================================================================
    // Scoreboard
    // =====================================================================

    #[test]
    fn test_scoreboard_tracks_hand_sizes_and_round() {
        let mut state = two_player_state();
        state.apply_snapshot(&GameSnapshot {
            phase: Phase::Playing,
            round: 4,
            current_turn: Some(PlayerId(1)),
            player_hands: Some(Map::from([
                (PlayerId(1), vec![card(1, "2"), card(2, "3")]),
                (PlayerId(2), vec![card(3, "4")]),
            ])),
            played_cards: None,
        });

        let mut table = table();
        table.refresh_scoreboard(&state);

        assert_eq!(table.round, 4);
        let mut scores = table.scoreboard.clone();
        scores.sort();
        assert_eq!(
            scores,
            vec![("alice".to_string(), 2), ("bob".to_string(), 1)]
        );
    }

    #[test]
    fn test_highlight_tracks_turn_owner() {
        let state = two_player_state();
        let mut table = table();
        table.highlight_turn(PlayerId(2), &state);
        assert_eq!(table.highlighted, Some(PlayerId(2)));
    }
}
