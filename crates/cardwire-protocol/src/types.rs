//! Core protocol types for Cardwire's wire format.
//!
//! This module defines every structure that travels over the session
//! channel as a JSON text frame, plus the catalog types fetched once at
//! startup. The server is authoritative for all of them: the client only
//! decodes, mirrors, and displays.
//!
//! The field names and `type` tags here are pinned to the server's wire
//! vocabulary (`gameId`, `currentTurn`, `playerHands`, `pp_path`, ...),
//! so every rename attribute in this file is load-bearing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::de::{self, Visitor};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Deserializes a `u64` id that may arrive as a JSON number OR a numeric
/// string.
///
/// The server is loose about id representation: `turn_change` can carry
/// `"playerId": 3` or `"playerId": "3"` depending on which code path
/// produced it, and hand/slot maps always use string keys (JSON object
/// keys are strings). Coercing here, at the single decode boundary, means
/// every comparison downstream is plain integer equality and the
/// string-vs-number mismatch bug class cannot reappear.
///
/// A non-numeric string is a hard decode error; the router treats the
/// whole frame as malformed and drops it.
fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a numeric id (number or numeric string)")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v)
                .map_err(|_| E::custom(format!("negative id {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(format!("non-numeric id {v:?}")))
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// A unique identifier for a player.
///
/// Newtype over `u64` so a `PlayerId` can't be confused with a `GameId`
/// even though both are numbers on the wire. Serializes as a plain
/// number; deserializes from a number or a numeric string (see
/// [`flexible_u64`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        flexible_u64(deserializer).map(PlayerId)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a game session.
///
/// Same newtype pattern and same flexible decoding as [`PlayerId`]: the
/// lobby endpoints return `idGame` as a number, but the value round-trips
/// through session storage as a string on the way back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameId(pub u64);

impl Serialize for GameId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        flexible_u64(deserializer).map(GameId)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// A unique identifier for a catalog card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A static catalog entry, fetched once at startup and never mutated.
///
/// `rank` and `suit` stay as strings: the client never computes with
/// them (win conditions are server-side), it only displays them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub rank: String,
    pub suit: String,
    /// Image reference for the card face. Wire name: `picture`.
    #[serde(rename = "picture")]
    pub image: String,
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Coarse session lifecycle stage.
///
/// Advances monotonically except on explicit restart, which resets the
/// session to `Waiting`. Lowercase on the wire (`"playing"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Waiting,
    Setup,
    Playing,
    Finished,
}

impl Phase {
    /// Position in the monotonic progression. Restart is the only
    /// transition that moves backwards.
    pub fn order(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Setup => 1,
            Self::Playing => 2,
            Self::Finished => 3,
        }
    }

    /// Returns `true` while actions may be dispatched.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Returns `true` once the session has ended.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Setup => write!(f, "setup"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot payloads
// ---------------------------------------------------------------------------

/// One participant as reported by a `connected_users` roster message.
///
/// `id` is optional because some roster broadcasts omit it for players
/// the server hasn't fully registered yet; reconciliation keys on
/// `username` and preserves a previously learned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
    pub username: String,
    /// Absent means connected: the server only annotates the flag when
    /// it has something to say.
    #[serde(default = "default_true")]
    pub connected: bool,
    /// Avatar reference. Wire name: `pp_path`.
    #[serde(rename = "pp_path", default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A complete authoritative state payload.
///
/// Snapshots fully replace the relevant local state on receipt, which is
/// what makes out-of-order arrival tolerable: reapplying the same
/// snapshot twice is a no-op. `player_hands` and `played_cards` are
/// optional because early-phase snapshots don't carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default = "default_round")]
    pub round: u32,
    #[serde(default)]
    pub current_turn: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_hands: Option<HashMap<PlayerId, Vec<Card>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_cards: Option<HashMap<PlayerId, Option<Card>>>,
}

fn default_round() -> u32 {
    1
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Waiting,
            round: 1,
            current_turn: None,
            player_hands: None,
            played_cards: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A player-initiated game action, nested inside `player_action` frames
/// in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    PlayCard {
        #[serde(rename = "cardId")]
        card_id: CardId,
    },
    DrawCard,
}

// ---------------------------------------------------------------------------
// ClientMessage — frames the client sends
// ---------------------------------------------------------------------------

/// Outbound protocol frames.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so
/// `ClientMessage::JoinGame { .. }` becomes
/// `{ "type": "join_game", "gameId": 7, "auth_token": "..." }`.
///
/// Every frame echoes `gameId` and the credential token; the server uses
/// the echo for per-message authorization rather than trusting the
/// connection alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request entry into the session.
    JoinGame {
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Ask for a full state snapshot (answered by `game_state`).
    GameStateRequest {
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Ask for a roster snapshot (answered by `connected_users`).
    ConnectedUsers {
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Submit a game action. The client never applies it locally; the
    /// authoritative effect arrives as later broadcasts.
    PlayerAction {
        action: PlayerAction,
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Send a chat line to the table.
    ChatMessage {
        message: String,
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Post-render hand-size telemetry for peers' scoreboards.
    PlayerHandUpdate {
        username: String,
        #[serde(rename = "cardCount")]
        card_count: usize,
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Ask the server to send everyone back to the lobby together.
    RedirectToLobby {
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },

    /// Best-effort notice that this client is going away.
    Disconnect {
        #[serde(rename = "gameId")]
        game_id: GameId,
        auth_token: String,
    },
}

// ---------------------------------------------------------------------------
// ServerMessage — frames the client receives
// ---------------------------------------------------------------------------

/// Inbound protocol frames.
///
/// An unknown `type` tag fails to decode; the router logs and drops the
/// frame without touching state, then keeps processing the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Entry granted. Triggers the two follow-up requests (state +
    /// roster).
    JoinGameSuccess {
        #[serde(rename = "gameId", default)]
        game_id: Option<GameId>,
    },

    /// Full authoritative snapshot.
    GameState {
        #[serde(rename = "gameState")]
        game_state: GameSnapshot,
    },

    /// Roster snapshot for reconciliation.
    ConnectedUsers { users: Vec<RosterEntry> },

    /// A peer (or this client, echoed) performed an action. Presentation
    /// only: hand truth arrives via the next `game_state`.
    PlayerAction {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        #[serde(default)]
        username: String,
        action: PlayerAction,
    },

    /// Turn ownership moved.
    TurnChange {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        #[serde(default)]
        username: String,
    },

    /// A round concluded; slots clear and the round counter advances.
    RoundResult {
        #[serde(rename = "winnerId", default)]
        winner_id: Option<PlayerId>,
        #[serde(rename = "winnerName", default)]
        winner_name: String,
        #[serde(rename = "cardCount", default)]
        card_count: u32,
        #[serde(rename = "newRound")]
        new_round: u32,
    },

    /// The session was reset. Local hands/slots clear and the client
    /// re-requests state + roster.
    GameRestart,

    /// The session ended.
    GameEnd {
        #[serde(rename = "winnerId", default)]
        winner_id: Option<PlayerId>,
        #[serde(rename = "winnerName", default)]
        winner_name: String,
    },

    /// One-shot navigation request, idempotent on the receiving side.
    RedirectToLobby,

    /// Non-fatal rejection or server-side complaint.
    Error { message: String },

    /// A chat line. The server broadcasts these as `message`; older
    /// builds echoed the client's own `chat_message` tag back.
    #[serde(rename = "message", alias = "chat_message")]
    Chat {
        owner: String,
        message: String,
        #[serde(rename = "user_pp_path", default)]
        avatar: Option<String>,
    },

    /// Variant stream: equal face-up values forced a continuation
    /// sub-phase. No core-state impact; routed to variant hooks.
    WarStart {
        #[serde(rename = "warRound", default)]
        war_round: u32,
    },

    /// Variant stream: progress text for the continuation sub-phase.
    WarProgress { message: String },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire format is an external contract: the server already
    //! speaks this JSON, so these tests pin exact shapes rather than
    //! just round-tripping.

    use super::*;

    // =====================================================================
    // Identity types and flexible decoding
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_deserializes_from_number() {
        let pid: PlayerId = serde_json::from_str("42").unwrap();
        assert_eq!(pid, PlayerId(42));
    }

    #[test]
    fn test_player_id_deserializes_from_numeric_string() {
        // The server sometimes sends ids as text. "3" and 3 must decode
        // to the same value or turn detection silently breaks.
        let pid: PlayerId = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(pid, PlayerId(3));
    }

    #[test]
    fn test_player_id_deserializes_from_padded_string() {
        let pid: PlayerId = serde_json::from_str("\" 17 \"").unwrap();
        assert_eq!(pid, PlayerId(17));
    }

    #[test]
    fn test_player_id_rejects_non_numeric_string() {
        let result: Result<PlayerId, _> = serde_json::from_str("\"alice\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_player_id_rejects_negative_number() {
        let result: Result<PlayerId, _> = serde_json::from_str("-4");
        assert!(result.is_err());
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_game_id_deserializes_from_either_form() {
        let a: GameId = serde_json::from_str("12").unwrap();
        let b: GameId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, GameId(12));
    }

    #[test]
    fn test_player_id_works_as_string_map_key() {
        // JSON object keys are always strings; the flexible decoder must
        // accept them so hand maps deserialize.
        let json = r#"{"5": [], "6": []}"#;
        let map: HashMap<PlayerId, Vec<Card>> =
            serde_json::from_str(json).unwrap();
        assert!(map.contains_key(&PlayerId(5)));
        assert!(map.contains_key(&PlayerId(6)));
    }

    // =====================================================================
    // Phase
    // =====================================================================

    #[test]
    fn test_phase_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Phase::Playing).unwrap(),
            "\"playing\""
        );
        assert_eq!(
            serde_json::to_string(&Phase::Finished).unwrap(),
            "\"finished\""
        );
    }

    #[test]
    fn test_phase_default_is_waiting() {
        assert_eq!(Phase::default(), Phase::Waiting);
    }

    #[test]
    fn test_phase_order_is_monotonic() {
        assert!(Phase::Waiting.order() < Phase::Setup.order());
        assert!(Phase::Setup.order() < Phase::Playing.order());
        assert!(Phase::Playing.order() < Phase::Finished.order());
    }

    // =====================================================================
    // Card + catalog
    // =====================================================================

    #[test]
    fn test_card_image_uses_picture_wire_name() {
        let card = Card {
            id: CardId(1),
            rank: "ace".into(),
            suit: "spades".into(),
            image: "cards/1.png".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&card).unwrap();
        assert_eq!(json["picture"], "cards/1.png");
        assert!(json.get("image").is_none());
    }

    // =====================================================================
    // RosterEntry
    // =====================================================================

    #[test]
    fn test_roster_entry_connected_defaults_to_true() {
        let entry: RosterEntry =
            serde_json::from_str(r#"{"username": "alice", "id": 1}"#).unwrap();
        assert!(entry.connected);
        assert_eq!(entry.id, Some(PlayerId(1)));
    }

    #[test]
    fn test_roster_entry_tolerates_missing_id_and_avatar() {
        let entry: RosterEntry =
            serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(entry.id, None);
        assert_eq!(entry.avatar, None);
    }

    #[test]
    fn test_roster_entry_avatar_uses_pp_path_wire_name() {
        let entry: RosterEntry = serde_json::from_str(
            r#"{"username": "bob", "pp_path": "pics/bob.jpg"}"#,
        )
        .unwrap();
        assert_eq!(entry.avatar.as_deref(), Some("pics/bob.jpg"));
    }

    // =====================================================================
    // GameSnapshot
    // =====================================================================

    #[test]
    fn test_snapshot_decodes_camel_case_fields() {
        let json = r#"{
            "phase": "playing",
            "round": 3,
            "currentTurn": "2",
            "playerHands": {
                "1": [{"id": 5, "rank": "9", "suit": "hearts", "picture": "c/5.png"}]
            },
            "playedCards": {"2": null}
        }"#;
        let snap: GameSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.phase, Phase::Playing);
        assert_eq!(snap.round, 3);
        assert_eq!(snap.current_turn, Some(PlayerId(2)));
        let hands = snap.player_hands.unwrap();
        assert_eq!(hands[&PlayerId(1)].len(), 1);
        let played = snap.played_cards.unwrap();
        assert_eq!(played[&PlayerId(2)], None);
    }

    #[test]
    fn test_snapshot_missing_fields_default() {
        // Early-phase snapshots carry only the phase.
        let snap: GameSnapshot =
            serde_json::from_str(r#"{"phase": "waiting"}"#).unwrap();
        assert_eq!(snap.round, 1);
        assert_eq!(snap.current_turn, None);
        assert!(snap.player_hands.is_none());
        assert!(snap.played_cards.is_none());
    }

    // =====================================================================
    // ClientMessage — exact JSON shapes
    // =====================================================================

    #[test]
    fn test_join_game_json_format() {
        let msg = ClientMessage::JoinGame {
            game_id: GameId(7),
            auth_token: "tok".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "join_game");
        assert_eq!(json["gameId"], 7);
        assert_eq!(json["auth_token"], "tok");
    }

    #[test]
    fn test_player_action_json_format() {
        let msg = ClientMessage::PlayerAction {
            action: PlayerAction::PlayCard { card_id: CardId(12) },
            game_id: GameId(7),
            auth_token: "tok".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "player_action");
        assert_eq!(json["action"]["type"], "play_card");
        assert_eq!(json["action"]["cardId"], 12);
    }

    #[test]
    fn test_player_hand_update_json_format() {
        let msg = ClientMessage::PlayerHandUpdate {
            username: "alice".into(),
            card_count: 26,
            game_id: GameId(7),
            auth_token: "tok".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "player_hand_update");
        assert_eq!(json["cardCount"], 26);
    }

    #[test]
    fn test_chat_message_json_format() {
        let msg = ClientMessage::ChatMessage {
            message: "hi".into(),
            game_id: GameId(1),
            auth_token: "tok".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "chat_message");
        assert_eq!(json["message"], "hi");
    }

    #[test]
    fn test_state_and_roster_request_tags() {
        let state = ClientMessage::GameStateRequest {
            game_id: GameId(1),
            auth_token: "t".into(),
        };
        let roster = ClientMessage::ConnectedUsers {
            game_id: GameId(1),
            auth_token: "t".into(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap()["type"],
            "game_state_request"
        );
        assert_eq!(
            serde_json::to_value(&roster).unwrap()["type"],
            "connected_users"
        );
    }

    // =====================================================================
    // ServerMessage — decoding real frames
    // =====================================================================

    #[test]
    fn test_turn_change_decodes_with_string_id() {
        let json = r#"{"type": "turn_change", "playerId": "3", "username": "carol"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ServerMessage::TurnChange {
                player_id: PlayerId(3),
                username: "carol".into(),
            }
        );
    }

    #[test]
    fn test_round_result_decodes() {
        let json = r#"{
            "type": "round_result",
            "winnerId": 2, "winnerName": "bob",
            "cardCount": 4, "newRound": 9
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ServerMessage::RoundResult {
                winner_id: Some(PlayerId(2)),
                winner_name: "bob".into(),
                card_count: 4,
                new_round: 9,
            }
        );
    }

    #[test]
    fn test_game_restart_decodes_from_bare_tag() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type": "game_restart"}"#).unwrap();
        assert_eq!(msg, ServerMessage::GameRestart);
    }

    #[test]
    fn test_chat_decodes_from_message_tag() {
        let json = r#"{"type": "message", "owner": "bob", "message": "gg"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ServerMessage::Chat { .. }));
    }

    #[test]
    fn test_chat_decodes_from_chat_message_alias() {
        let json = r#"{"type": "chat_message", "owner": "bob", "message": "gg"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ServerMessage::Chat { .. }));
    }

    #[test]
    fn test_war_start_decodes() {
        let json = r#"{"type": "war_start", "warRound": 2}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ServerMessage::WarStart { war_round: 2 });
    }

    #[test]
    fn test_unknown_type_tag_fails_to_decode() {
        let json = r#"{"type": "fly_to_moon", "speed": 9000}"#;
        let result: Result<ServerMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let result: Result<ServerMessage, _> =
            serde_json::from_str("not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_player_action_broadcast_round_trip() {
        let msg = ServerMessage::PlayerAction {
            player_id: PlayerId(4),
            username: "dora".into(),
            action: PlayerAction::PlayCard { card_id: CardId(31) },
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }
}
