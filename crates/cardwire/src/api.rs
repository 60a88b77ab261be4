//! The lobby API: request/response endpoints around the session.
//!
//! Everything here is an external contract owned by the backend: session
//! lookup and membership, start/restart, the debug forced-finish, the
//! card catalog, and the fire-and-forget disconnect beacon. The engine
//! treats these as simple async calls; the only state they touch is the
//! context's game id.
//!
//! Start/restart deliberately go over HTTP even though a channel exists:
//! the server answers with a plain acknowledgment and then broadcasts
//! the resulting state over the channel to every participant.

use std::sync::Arc;

use cardwire_channel::DisconnectNotice;
use cardwire_protocol::{Card, GameId};
use cardwire_session::SessionContext;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Configuration + errors
// ---------------------------------------------------------------------------

/// Lobby endpoint configuration.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// HTTP base, e.g. `http://localhost:3000`.
    pub base_url: String,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Errors from the lobby endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No credential token to authorize the call with.
    #[error("authentication required: no credential token")]
    AuthRequired,

    /// Transport-level failure (DNS, TCP, TLS, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("lobby request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// `{ "game": { "idGame": 7, ... } }`, with `game` absent or null when
/// the user is not in a session.
#[derive(Debug, Deserialize)]
struct ActiveGameResponse {
    #[serde(default)]
    game: Option<GameRef>,
}

#[derive(Debug, Deserialize)]
struct GameRef {
    #[serde(rename = "idGame")]
    id_game: GameId,
}

#[derive(Debug, Deserialize)]
struct CardsResponse {
    cards: Vec<Card>,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    #[serde(default)]
    games: Vec<GameSummary>,
}

/// One joinable session in the lobby listing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameSummary {
    #[serde(rename = "idGame")]
    pub id: GameId,
}

/// `{ "error": "..." }` on failures, when the server bothers.
#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the lobby endpoints. Cheap to share via `Arc`.
pub struct LobbyApi {
    http: reqwest::Client,
    config: LobbyConfig,
    context: Arc<SessionContext>,
}

impl LobbyApi {
    pub fn new(config: LobbyConfig, context: Arc<SessionContext>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            context,
        }
    }

    /// "Is this user currently in a game?" Returns the session id when
    /// the server says yes.
    pub async fn active_game(&self) -> Result<Option<GameId>, ApiError> {
        let resp = self
            .http
            .get(self.url("/active-game"))
            .bearer_auth(self.credential()?)
            .send()
            .await?;
        if !resp.status().is_success() {
            // Not being in a game is a normal answer, not a fault.
            return Ok(None);
        }
        let body: ActiveGameResponse = resp.json().await?;
        Ok(body.game.map(|g| g.id_game))
    }

    /// Lists joinable sessions.
    pub async fn list_games(&self) -> Result<Vec<GameSummary>, ApiError> {
        let resp = self.http.get(self.url("/games")).send().await?;
        let resp = check_status(resp).await?;
        let body: GamesResponse = resp.json().await?;
        Ok(body.games)
    }

    /// Creates a session and returns its id.
    pub async fn create_game(&self) -> Result<GameId, ApiError> {
        let resp = self
            .http
            .post(self.url("/create-game"))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: ActiveGameResponse = resp.json().await?;
        body.game.map(|g| g.id_game).ok_or(ApiError::Status {
            status: 200,
            message: "create-game returned no game".into(),
        })
    }

    /// Joins an existing session.
    pub async fn join_game(&self, game_id: GameId) -> Result<(), ApiError> {
        self.post_game_id("/join-game", game_id).await
    }

    /// Starts the session. The resulting `game_state` arrives over the
    /// channel.
    pub async fn start_game(&self, game_id: GameId) -> Result<(), ApiError> {
        self.post_game_id("/start-game", game_id).await
    }

    /// Restarts a finished session for everyone.
    pub async fn restart_game(&self, game_id: GameId) -> Result<(), ApiError> {
        self.post_game_id("/restart-game", game_id).await
    }

    /// Debug-only forced finish.
    pub async fn finish_game(&self, game_id: GameId) -> Result<(), ApiError> {
        self.post_game_id("/finish-game", game_id).await
    }

    /// Fetches the ordered card catalog. Called once at startup.
    pub async fn fetch_cards(&self) -> Result<Vec<Card>, ApiError> {
        let resp = self.http.get(self.url("/api/cards")).send().await?;
        let resp = check_status(resp).await?;
        let body: CardsResponse = resp.json().await?;
        tracing::info!(cards = body.cards.len(), "card catalog fetched");
        Ok(body.cards)
    }

    /// Builds the out-of-band disconnect beacon for the channel.
    pub fn beacon(&self) -> LobbyBeacon {
        LobbyBeacon {
            http: self.http.clone(),
            url: self.url("/disconnect-from-game"),
        }
    }

    // -- Helpers ----------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn credential(&self) -> Result<String, ApiError> {
        self.context.credential().ok_or(ApiError::AuthRequired)
    }

    async fn post_game_id(
        &self,
        path: &str,
        game_id: GameId,
    ) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(self.credential()?)
            .json(&serde_json::json!({ "gameId": game_id }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| status.to_string());
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

// ---------------------------------------------------------------------------
// Disconnect beacon
// ---------------------------------------------------------------------------

/// Fire-and-forget disconnect notice (sendBeacon semantics): one POST
/// with the credential in the query string, response ignored entirely.
pub struct LobbyBeacon {
    http: reqwest::Client,
    url: String,
}

impl DisconnectNotice for LobbyBeacon {
    fn notify(&self, credential: &str) {
        let token = utf8_percent_encode(credential, NON_ALPHANUMERIC);
        let url = format!("{}?auth_token={token}", self.url);
        let http = self.http.clone();
        tokio::spawn(async move {
            if let Err(e) = http.post(url).send().await {
                tracing::debug!(error = %e, "disconnect beacon failed");
            }
        });
    }
}

// =========================================================================
// Tests
// =========================================================================
