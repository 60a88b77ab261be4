//! The session context: one explicit object holding everything the
//! surrounding application supplies for a session.
//!
//! Everything here lives in a single `SessionContext` that is created
//! once, wrapped in an `Arc`, and passed to every component at
//! construction. No component performs an ambient lookup; there are no
//! process-wide globals.
//!
//! The context is shared with background tasks (liveness probe, channel
//! I/O), so mutation goes through atomics and short-lived mutexes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use cardwire_protocol::GameId;

/// Externally supplied session inputs: credential, identity, session id,
/// and the navigation-intent flags that gate reconnect/disconnect
/// behavior.
#[derive(Debug)]
pub struct SessionContext {
    /// Cached username. Fixed for the life of the session; roster
    /// reconciliation matches against it to derive the local player id.
    username: String,

    /// Credential token appended to the channel URL and echoed in every
    /// outbound frame. `None` means authentication is required before a
    /// connection may be attempted.
    auth_token: Mutex<Option<String>>,

    /// The session currently joined (or about to be).
    game_id: Mutex<Option<GameId>>,

    /// "This is intentional in-app navigation": suppresses the
    /// disconnect notice on teardown and stops the liveness probe from
    /// reconnecting.
    intentional_navigation: AtomicBool,

    /// "The channel was already open going into this navigation":
    /// suppresses the return-to-authentication flow on an expected
    /// close.
    channel_was_open: AtomicBool,

    /// Local bookkeeping readiness: card catalog loaded and presentation
    /// mounted. The channel defers the initial join until this is set.
    ready: AtomicBool,
}

impl SessionContext {
    /// Creates a context for the given identity with no credential and
    /// no session.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth_token: Mutex::new(None),
            game_id: Mutex::new(None),
            intentional_navigation: AtomicBool::new(false),
            channel_was_open: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        }
    }

    /// Builder-style credential injection.
    pub fn with_credential(self, token: impl Into<String>) -> Self {
        *self.auth_token.lock().expect("context lock poisoned") =
            Some(token.into());
        self
    }

    /// Builder-style session id injection.
    pub fn with_game(self, game_id: GameId) -> Self {
        *self.game_id.lock().expect("context lock poisoned") = Some(game_id);
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The credential token, if one has been issued.
    pub fn credential(&self) -> Option<String> {
        self.auth_token.lock().expect("context lock poisoned").clone()
    }

    pub fn set_credential(&self, token: Option<String>) {
        *self.auth_token.lock().expect("context lock poisoned") = token;
    }

    pub fn game_id(&self) -> Option<GameId> {
        *self.game_id.lock().expect("context lock poisoned")
    }

    pub fn set_game_id(&self, game_id: Option<GameId>) {
        *self.game_id.lock().expect("context lock poisoned") = game_id;
    }

    // -- Navigation-intent flags ------------------------------------------

    /// Marks the upcoming teardown as intentional in-app navigation.
    /// Every in-app navigation path sets both flags together.
    pub fn mark_intentional_navigation(&self) {
        self.intentional_navigation.store(true, Ordering::SeqCst);
        self.channel_was_open.store(true, Ordering::SeqCst);
    }

    /// Clears both navigation flags. Called once the session page has
    /// finished initializing, so a later ungraceful close is treated as
    /// genuine.
    pub fn clear_navigation_flags(&self) {
        self.intentional_navigation.store(false, Ordering::SeqCst);
        self.channel_was_open.store(false, Ordering::SeqCst);
    }

    pub fn is_intentional_navigation(&self) -> bool {
        self.intentional_navigation.load(Ordering::SeqCst)
    }

    pub fn channel_was_open(&self) -> bool {
        self.channel_was_open.load(Ordering::SeqCst)
    }

    // -- Readiness --------------------------------------------------------

    /// Signals that local bookkeeping (catalog + presentation) is ready;
    /// the channel may now send the initial join.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_has_no_credential_or_session() {
        let ctx = SessionContext::new("alice");
        assert_eq!(ctx.username(), "alice");
        assert_eq!(ctx.credential(), None);
        assert_eq!(ctx.game_id(), None);
        assert!(!ctx.is_ready());
    }

    #[test]
    fn test_builder_sets_credential_and_game() {
        let ctx = SessionContext::new("alice")
            .with_credential("tok")
            .with_game(GameId(9));
        assert_eq!(ctx.credential().as_deref(), Some("tok"));
        assert_eq!(ctx.game_id(), Some(GameId(9)));
    }

    #[test]
    fn test_mark_intentional_navigation_sets_both_flags() {
        let ctx = SessionContext::new("alice");
        ctx.mark_intentional_navigation();
        assert!(ctx.is_intentional_navigation());
        assert!(ctx.channel_was_open());
    }

    #[test]
    fn test_clear_navigation_flags_resets_both() {
        let ctx = SessionContext::new("alice");
        ctx.mark_intentional_navigation();
        ctx.clear_navigation_flags();
        assert!(!ctx.is_intentional_navigation());
        assert!(!ctx.channel_was_open());
    }

    #[test]
    fn test_mark_ready_is_sticky() {
        let ctx = SessionContext::new("alice");
        ctx.mark_ready();
        assert!(ctx.is_ready());
        ctx.mark_ready();
        assert!(ctx.is_ready());
    }
}
