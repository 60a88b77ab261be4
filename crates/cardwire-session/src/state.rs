//! The authoritative local mirror of server state.
//!
//! `SessionState` holds everything the server broadcasts about one game
//! instance: roster, hands, played-card slots, phase, round, and turn
//! ownership. It has exactly one writer (the [`MessageRouter`]) and many
//! readers; nothing else may mutate it.
//!
//! Two rules shape every method here:
//!
//! 1. **Snapshots replace, never patch.** Hands and slots are wholesale
//!    replaced when a snapshot carries them, so reapplying the same
//!    snapshot is a no-op and out-of-order arrival is tolerable.
//! 2. **Players are never deleted.** Roster reconciliation only toggles
//!    `connected`; disconnection is reversible.
//!
//! [`MessageRouter`]: crate::MessageRouter

use std::collections::HashMap;

use cardwire_protocol::{Card, CardId, GameSnapshot, Phase, PlayerId};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One tracked participant.
///
/// `id` is optional because a roster broadcast can precede the server
/// assigning the player a numeric id; once learned, the id is preserved
/// across later merges.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: Option<PlayerId>,
    pub username: String,
    pub connected: bool,
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// SnapshotDiff
// ---------------------------------------------------------------------------

/// What changed when a snapshot was applied, so the router can decide
/// which side effects to fire. Applying an identical snapshot twice
/// yields an all-false diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub phase_changed: bool,
    pub round_changed: bool,
    pub turn_changed: bool,
    /// The snapshot carried a hands map (hands were replaced).
    pub hands_replaced: bool,
    /// The snapshot carried a played-cards map (slots were replaced).
    pub slots_replaced: bool,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The local mirror for one game instance.
#[derive(Debug, Default)]
pub struct SessionState {
    phase: Phase,
    round: u32,
    current_turn: Option<PlayerId>,
    /// The local player's id, derived during roster reconciliation and
    /// nowhere else.
    self_id: Option<PlayerId>,
    players: Vec<Player>,
    /// Private hands keyed by player, fully replaced on snapshots.
    hands: HashMap<PlayerId, Vec<Card>>,
    /// Face-up card per player for the current round.
    played: HashMap<PlayerId, Card>,
    /// Static card catalog, loaded once at startup.
    catalog: HashMap<CardId, Card>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            round: 1,
            ..Self::default()
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_turn(&self) -> Option<PlayerId> {
        self.current_turn
    }

    pub fn self_id(&self) -> Option<PlayerId> {
        self.self_id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_by_id(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == Some(id))
    }

    pub fn hand(&self, player: PlayerId) -> Option<&[Card]> {
        self.hands.get(&player).map(Vec::as_slice)
    }

    /// The local player's hand, empty until a snapshot delivers it.
    pub fn own_hand(&self) -> &[Card] {
        self.self_id
            .and_then(|id| self.hands.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn hand_size(&self, player: PlayerId) -> usize {
        self.hands.get(&player).map_or(0, Vec::len)
    }

    pub fn played_slot(&self, player: PlayerId) -> Option<&Card> {
        self.played.get(&player)
    }

    pub fn played_slots(&self) -> &HashMap<PlayerId, Card> {
        &self.played
    }

    pub fn catalog_card(&self, id: CardId) -> Option<&Card> {
        self.catalog.get(&id)
    }

    /// True when the local player holds the given card.
    pub fn own_hand_contains(&self, card_id: CardId) -> bool {
        self.own_hand().iter().any(|c| c.id == card_id)
    }

    // -- Turn ownership ---------------------------------------------------

    /// The turn-ownership predicate guarding every outbound action.
    ///
    /// False unless the phase is `playing`, a turn owner is known, the
    /// local id has been derived, and the two are equal. Both ids were
    /// numerically coerced at the decode boundary, so this is plain
    /// integer equality regardless of how the server spelled them.
    pub fn is_my_turn(&self) -> bool {
        if !self.phase.is_playing() {
            return false;
        }
        match (self.current_turn, self.self_id) {
            (Some(turn), Some(me)) => turn == me,
            _ => false,
        }
    }

    // -- Mutations (router only) ------------------------------------------

    /// Installs the static card catalog. Called once at startup.
    pub fn load_catalog(&mut self, cards: Vec<Card>) {
        self.catalog = cards.into_iter().map(|c| (c.id, c)).collect();
        tracing::info!(cards = self.catalog.len(), "card catalog loaded");
    }

    /// Applies a full authoritative snapshot, replacing phase, round,
    /// turn, and (when carried) hands and slots. Returns what changed.
    pub fn apply_snapshot(&mut self, snapshot: &GameSnapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff {
            phase_changed: self.phase != snapshot.phase,
            round_changed: self.round != snapshot.round,
            turn_changed: self.current_turn != snapshot.current_turn,
            ..SnapshotDiff::default()
        };

        if snapshot.phase.order() < self.phase.order() {
            // Restarts come via game_restart; a backwards phase inside a
            // snapshot means the server state moved under us.
            tracing::debug!(
                from = %self.phase,
                to = %snapshot.phase,
                "snapshot moved phase backwards"
            );
        }

        self.phase = snapshot.phase;
        self.round = snapshot.round;
        self.current_turn = snapshot.current_turn;

        if let Some(hands) = &snapshot.player_hands {
            self.hands = hands.clone();
            diff.hands_replaced = true;
        }

        if let Some(slots) = &snapshot.played_cards {
            // The wire allows explicit nulls for empty slots; only
            // occupied slots are kept locally.
            self.played = slots
                .iter()
                .filter_map(|(pid, card)| {
                    card.as_ref().map(|c| (*pid, c.clone()))
                })
                .collect();
            diff.slots_replaced = true;
        }

        diff
    }

    /// Merges an incoming roster into the tracked player list.
    ///
    /// For each incoming entry: if a player with that username is
    /// already tracked, merge the new fields in place, keeping a
    /// locally known id when the entry carries none; otherwise insert
    /// the entry as a new player. Anyone tracked but absent from the
    /// incoming list is marked `connected = false` and retained.
    ///
    /// Afterwards the local player id is re-derived by matching
    /// `self_username` against the merged roster. This is the only
    /// place `self_id` is ever established.
    pub fn reconcile_roster(
        &mut self,
        incoming: Vec<cardwire_protocol::RosterEntry>,
        self_username: &str,
    ) {
        for entry in &incoming {
            match self
                .players
                .iter_mut()
                .find(|p| p.username == entry.username)
            {
                Some(known) => {
                    if entry.id.is_some() {
                        known.id = entry.id;
                    }
                    known.connected = entry.connected;
                    if entry.avatar.is_some() {
                        known.avatar = entry.avatar.clone();
                    }
                }
                None => {
                    self.players.push(Player {
                        id: entry.id,
                        username: entry.username.clone(),
                        connected: entry.connected,
                        avatar: entry.avatar.clone(),
                    });
                }
            }
        }

        // Absentees disconnected; they may come back, so keep them.
        for player in &mut self.players {
            if !incoming.iter().any(|e| e.username == player.username) {
                player.connected = false;
            }
        }

        let derived = self
            .players
            .iter()
            .find(|p| p.username == self_username)
            .and_then(|p| p.id);
        if derived != self.self_id {
            tracing::debug!(?derived, "local player id derived from roster");
            self.self_id = derived;
        }
    }

    /// Sets the turn owner. Returns `true` if ownership actually moved.
    pub fn set_turn(&mut self, player: PlayerId) -> bool {
        let changed = self.current_turn != Some(player);
        self.current_turn = Some(player);
        changed
    }

    /// Round boundary: advance the counter and clear every played slot.
    pub fn advance_round(&mut self, new_round: u32) {
        self.round = new_round;
        self.played.clear();
    }

    /// Records a peer's face-up card for the current round. Returns
    /// `false` if the slot was already occupied (duplicate broadcast).
    pub fn record_played_slot(&mut self, player: PlayerId, card: Card) -> bool {
        if self.played.contains_key(&player) {
            return false;
        }
        self.played.insert(player, card);
        true
    }

    /// Explicit restart: back to `waiting`, round 1, no hands, no slots.
    /// The roster and catalog survive; identity is not forgotten.
    pub fn reset_for_restart(&mut self) {
        self.phase = Phase::Waiting;
        self.round = 1;
        self.current_turn = None;
        self.hands.clear();
        self.played.clear();
    }

    /// Marks the session finished.
    pub fn finish(&mut self) {
        self.phase = Phase::Finished;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cardwire_protocol::RosterEntry;

    // -- Helpers ----------------------------------------------------------

    fn card(id: u32) -> Card {
        Card {
            id: CardId(id),
            rank: "9".into(),
            suit: "hearts".into(),
            image: format!("cards/{id}.png"),
        }
    }

    fn entry(username: &str, id: u64) -> RosterEntry {
        RosterEntry {
            id: Some(PlayerId(id)),
            username: username.into(),
            connected: true,
            avatar: None,
        }
    }

    fn playing_snapshot(round: u32, turn: u64) -> GameSnapshot {
        GameSnapshot {
            phase: Phase::Playing,
            round,
            current_turn: Some(PlayerId(turn)),
            ..GameSnapshot::default()
        }
    }

    // =====================================================================
    // reconcile_roster()
    // =====================================================================

    #[test]
    fn test_reconcile_roster_adds_new_players() {
        // Roster [a] then [a, b]: two entries, "a" unchanged, "b" added.
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1)], "a");
        state.reconcile_roster(vec![entry("a", 1), entry("b", 2)], "a");

        assert_eq!(state.players().len(), 2);
        assert_eq!(state.players()[0].id, Some(PlayerId(1)));
        assert_eq!(state.players()[1].username, "b");
        assert_eq!(state.players()[1].id, Some(PlayerId(2)));
    }

    #[test]
    fn test_reconcile_roster_never_removes_players() {
        // A player once seen is never removed, only toggled connected.
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1), entry("b", 2)], "a");
        state.reconcile_roster(vec![entry("a", 1)], "a");

        assert_eq!(state.players().len(), 2);
        let b = &state.players()[1];
        assert_eq!(b.username, "b");
        assert!(!b.connected);
    }

    #[test]
    fn test_reconcile_roster_disconnection_is_reversible() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1), entry("b", 2)], "a");
        state.reconcile_roster(vec![entry("a", 1)], "a");
        state.reconcile_roster(vec![entry("a", 1), entry("b", 2)], "a");

        assert_eq!(state.players().len(), 2);
        assert!(state.players()[1].connected);
    }

    #[test]
    fn test_reconcile_roster_preserves_known_id_when_entry_lacks_one() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1)], "a");

        // Later broadcast omits the id; the learned one must survive.
        state.reconcile_roster(
            vec![RosterEntry {
                id: None,
                username: "a".into(),
                connected: true,
                avatar: None,
            }],
            "a",
        );

        assert_eq!(state.players()[0].id, Some(PlayerId(1)));
        assert_eq!(state.self_id(), Some(PlayerId(1)));
    }

    #[test]
    fn test_reconcile_roster_derives_self_id() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1), entry("b", 2)], "b");
        assert_eq!(state.self_id(), Some(PlayerId(2)));
    }

    #[test]
    fn test_reconcile_roster_unknown_username_leaves_self_unset() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1)], "nobody");
        assert_eq!(state.self_id(), None);
    }

    // =====================================================================
    // apply_snapshot()
    // =====================================================================

    #[test]
    fn test_apply_snapshot_reports_changes() {
        let mut state = SessionState::new();
        let diff = state.apply_snapshot(&playing_snapshot(2, 1));

        assert!(diff.phase_changed);
        assert!(diff.round_changed);
        assert!(diff.turn_changed);
        assert_eq!(state.phase(), Phase::Playing);
        assert_eq!(state.round(), 2);
        assert_eq!(state.current_turn(), Some(PlayerId(1)));
    }

    #[test]
    fn test_apply_snapshot_twice_is_idempotent() {
        let mut state = SessionState::new();
        let snap = GameSnapshot {
            player_hands: Some(HashMap::from([(
                PlayerId(1),
                vec![card(5), card(6)],
            )])),
            played_cards: Some(HashMap::from([(
                PlayerId(2),
                Some(card(9)),
            )])),
            ..playing_snapshot(3, 1)
        };

        state.apply_snapshot(&snap);
        let hand_after_first = state.hand(PlayerId(1)).unwrap().to_vec();

        let diff = state.apply_snapshot(&snap);

        // Same state, and no spurious change signals.
        assert!(!diff.phase_changed);
        assert!(!diff.round_changed);
        assert!(!diff.turn_changed);
        assert_eq!(state.hand(PlayerId(1)).unwrap(), hand_after_first);
        assert_eq!(state.played_slot(PlayerId(2)), Some(&card(9)));
    }

    #[test]
    fn test_apply_snapshot_replaces_hands_wholesale() {
        // Stale local hands must not survive a snapshot that carries
        // hands. The server is the single writer.
        let mut state = SessionState::new();
        state.apply_snapshot(&GameSnapshot {
            player_hands: Some(HashMap::from([(
                PlayerId(1),
                vec![card(1), card(2), card(3)],
            )])),
            ..playing_snapshot(1, 1)
        });

        state.apply_snapshot(&GameSnapshot {
            player_hands: Some(HashMap::from([(PlayerId(1), vec![card(7)])])),
            ..playing_snapshot(1, 1)
        });

        assert_eq!(state.hand(PlayerId(1)).unwrap(), &[card(7)]);
    }

    #[test]
    fn test_apply_snapshot_without_hands_keeps_existing() {
        let mut state = SessionState::new();
        state.apply_snapshot(&GameSnapshot {
            player_hands: Some(HashMap::from([(PlayerId(1), vec![card(1)])])),
            ..playing_snapshot(1, 1)
        });

        // A later snapshot without hands leaves them untouched.
        state.apply_snapshot(&playing_snapshot(1, 2));
        assert_eq!(state.hand_size(PlayerId(1)), 1);
    }

    #[test]
    fn test_apply_snapshot_drops_null_slots() {
        let mut state = SessionState::new();
        state.apply_snapshot(&GameSnapshot {
            played_cards: Some(HashMap::from([
                (PlayerId(1), Some(card(4))),
                (PlayerId(2), None),
            ])),
            ..playing_snapshot(1, 1)
        });

        assert!(state.played_slot(PlayerId(1)).is_some());
        assert!(state.played_slot(PlayerId(2)).is_none());
    }

    // =====================================================================
    // is_my_turn()
    // =====================================================================

    #[test]
    fn test_is_my_turn_false_outside_playing_phase() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1)], "a");
        state.apply_snapshot(&GameSnapshot {
            phase: Phase::Waiting,
            current_turn: Some(PlayerId(1)),
            ..GameSnapshot::default()
        });

        // Ids match, but the phase gate comes first.
        assert!(!state.is_my_turn());
    }

    #[test]
    fn test_is_my_turn_false_without_turn_owner() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1)], "a");
        state.apply_snapshot(&GameSnapshot {
            phase: Phase::Playing,
            current_turn: None,
            ..GameSnapshot::default()
        });

        assert!(!state.is_my_turn());
    }

    #[test]
    fn test_is_my_turn_false_without_self_id() {
        let mut state = SessionState::new();
        state.apply_snapshot(&playing_snapshot(1, 1));
        assert!(!state.is_my_turn());
    }

    #[test]
    fn test_is_my_turn_true_on_numeric_match() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 3)], "a");
        state.apply_snapshot(&playing_snapshot(1, 3));
        assert!(state.is_my_turn());
    }

    #[test]
    fn test_is_my_turn_invariant_under_string_id_form() {
        // turn_change with playerId "3" (text) when self.id is 3
        // (number): coercion happens at decode, so the predicate holds.
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 3)], "a");
        state.apply_snapshot(&GameSnapshot {
            phase: Phase::Playing,
            ..GameSnapshot::default()
        });

        let turn: PlayerId = serde_json::from_str("\"3\"").unwrap();
        state.set_turn(turn);

        assert!(state.is_my_turn());
    }

    // =====================================================================
    // Round + restart transitions
    // =====================================================================

    #[test]
    fn test_set_turn_reports_ownership_moves() {
        let mut state = SessionState::new();
        assert!(state.set_turn(PlayerId(1)));
        assert!(!state.set_turn(PlayerId(1)));
        assert!(state.set_turn(PlayerId(2)));
    }

    #[test]
    fn test_advance_round_clears_slots() {
        let mut state = SessionState::new();
        state.record_played_slot(PlayerId(1), card(4));
        state.advance_round(5);

        assert_eq!(state.round(), 5);
        assert!(state.played_slots().is_empty());
    }

    #[test]
    fn test_record_played_slot_rejects_duplicates() {
        let mut state = SessionState::new();
        assert!(state.record_played_slot(PlayerId(1), card(4)));
        assert!(!state.record_played_slot(PlayerId(1), card(4)));
        assert!(!state.record_played_slot(PlayerId(1), card(8)));
    }

    #[test]
    fn test_reset_for_restart_while_finished() {
        // Restart while finished: waiting, round 1, no hands, no slots.
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1), entry("b", 2)], "a");
        state.apply_snapshot(&GameSnapshot {
            phase: Phase::Finished,
            round: 12,
            player_hands: Some(HashMap::from([(PlayerId(1), vec![card(1)])])),
            played_cards: Some(HashMap::from([(PlayerId(2), Some(card(2)))])),
            ..GameSnapshot::default()
        });

        state.reset_for_restart();

        assert_eq!(state.phase(), Phase::Waiting);
        assert_eq!(state.round(), 1);
        assert!(state.hand(PlayerId(1)).is_none());
        assert!(state.played_slots().is_empty());
        // Identity survives a restart.
        assert_eq!(state.players().len(), 2);
        assert_eq!(state.self_id(), Some(PlayerId(1)));
    }

    // =====================================================================
    // Catalog + hand helpers
    // =====================================================================

    #[test]
    fn test_load_catalog_enables_lookup() {
        let mut state = SessionState::new();
        state.load_catalog(vec![card(1), card(2)]);
        assert_eq!(state.catalog_card(CardId(2)), Some(&card(2)));
        assert_eq!(state.catalog_card(CardId(3)), None);
    }

    #[test]
    fn test_own_hand_empty_until_snapshot_arrives() {
        let mut state = SessionState::new();
        state.reconcile_roster(vec![entry("a", 1)], "a");
        assert!(state.own_hand().is_empty());

        state.apply_snapshot(&GameSnapshot {
            player_hands: Some(HashMap::from([(PlayerId(1), vec![card(5)])])),
            ..playing_snapshot(1, 1)
        });
        assert_eq!(state.own_hand(), &[card(5)]);
        assert!(state.own_hand_contains(CardId(5)));
        assert!(!state.own_hand_contains(CardId(6)));
    }
}
