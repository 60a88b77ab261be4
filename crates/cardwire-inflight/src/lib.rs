//! TTL-keyed in-flight registry for Cardwire.
//!
//! A small guard table preventing the same logical event from producing
//! two concurrent effects. Two callers share it:
//!
//! - presentation dispatch, to skip a second visual effect for an event
//!   already rendered through an optimistic local path, and
//! - the action dispatcher, as a double-submission window keyed by card
//!   id (double-click protection).
//!
//! The registry is a plain map from key to expiry instant driven by an
//! injectable monotonic [`Clock`]: expiry is lazy (checked on lookup),
//! nothing spawns timers, and tests control time directly. The registry
//! guards *presentation and dispatch* only; protocol state handling
//! never consults it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cardwire_protocol::{CardId, PlayerId};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A monotonic time source.
///
/// Production uses [`SystemClock`]; tests use [`ManualClock`] to step
/// time explicitly instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A hand-driven clock for deterministic tests.
///
/// Cloning shares the underlying instant, so a clone held by the
/// registry sees every [`advance`](Self::advance) made through the
/// original.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::sync::Arc<std::sync::Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::Mutex::new(Instant::now())),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock poisoned")
    }
}

// ---------------------------------------------------------------------------
// Key builders
// ---------------------------------------------------------------------------

/// Key for a card-play effect: `play-{player}-{card}`.
pub fn play_key(player: PlayerId, card: CardId) -> String {
    format!("play-{}-{}", player.0, card.0)
}

/// Key for a card-draw effect: `draw-{player}`.
pub fn draw_key(player: PlayerId) -> String {
    format!("draw-{}", player.0)
}

/// Key for the dispatch guard on an outbound play: `dispatch-{card}`.
pub fn dispatch_key(card: CardId) -> String {
    format!("dispatch-{}", card.0)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A mapping from event key to expiry instant.
///
/// Generic over the clock so the expiry logic tests without a runtime.
/// The default instantiation uses the real monotonic clock.
#[derive(Debug)]
pub struct InFlightRegistry<C: Clock = SystemClock> {
    entries: HashMap<String, Instant>,
    clock: C,
}

impl InFlightRegistry<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InFlightRegistry<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InFlightRegistry<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Marks a key as in flight for `ttl`. Re-marking an existing key
    /// extends its window. Expired entries are swept opportunistically
    /// so the map can't grow unbounded across a long session.
    pub fn mark(&mut self, key: impl Into<String>, ttl: Duration) {
        let now = self.clock.now();
        self.entries.retain(|_, expiry| *expiry > now);
        let key = key.into();
        tracing::trace!(%key, ?ttl, "effect marked in flight");
        self.entries.insert(key, now + ttl);
    }

    /// Pure lookup: is this key currently in flight?
    pub fn is_in_flight(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(expiry) => *expiry > self.clock.now(),
            None => false,
        }
    }

    /// Marks the key and reports whether it was already in flight.
    /// The common "guard this effect" call shape: returns `true` when
    /// the caller should proceed, `false` when a duplicate is running.
    pub fn try_begin(&mut self, key: impl Into<String>, ttl: Duration) -> bool {
        let key = key.into();
        if self.is_in_flight(&key) {
            tracing::debug!(%key, "duplicate effect suppressed");
            return false;
        }
        self.mark(key, ttl);
        true
    }

    /// Drops every expired entry now instead of waiting for the next
    /// `mark`.
    pub fn purge_expired(&mut self) {
        let now = self.clock.now();
        self.entries.retain(|_, expiry| *expiry > now);
    }

    /// Cancels everything. Called on session teardown so no guard
    /// outlives the session it belonged to.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked entries, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(1000);

    fn registry() -> (InFlightRegistry<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (InFlightRegistry::with_clock(clock.clone()), clock)
    }

    // =====================================================================
    // mark() / is_in_flight()
    // =====================================================================

    #[test]
    fn test_mark_then_lookup_is_in_flight() {
        let (mut reg, _clock) = registry();
        reg.mark("play-1-5", TTL);
        assert!(reg.is_in_flight("play-1-5"));
    }

    #[test]
    fn test_unmarked_key_is_not_in_flight() {
        let (reg, _clock) = registry();
        assert!(!reg.is_in_flight("play-1-5"));
    }

    #[test]
    fn test_key_expires_after_ttl() {
        let (mut reg, clock) = registry();
        reg.mark("play-1-5", TTL);

        clock.advance(TTL + Duration::from_millis(1));

        assert!(!reg.is_in_flight("play-1-5"));
    }

    #[test]
    fn test_key_still_in_flight_just_before_ttl() {
        let (mut reg, clock) = registry();
        reg.mark("play-1-5", TTL);

        clock.advance(TTL - Duration::from_millis(1));

        assert!(reg.is_in_flight("play-1-5"));
    }

    #[test]
    fn test_remark_extends_window() {
        let (mut reg, clock) = registry();
        reg.mark("k", TTL);
        clock.advance(Duration::from_millis(800));
        reg.mark("k", TTL);
        clock.advance(Duration::from_millis(800));

        // 1600ms after the first mark, but only 800ms after the second.
        assert!(reg.is_in_flight("k"));
    }

    #[test]
    fn test_keys_are_independent() {
        let (mut reg, _clock) = registry();
        reg.mark("play-1-5", TTL);
        assert!(!reg.is_in_flight("play-2-5"));
        assert!(!reg.is_in_flight("play-1-6"));
    }

    // =====================================================================
    // try_begin()
    // =====================================================================

    #[test]
    fn test_try_begin_first_call_proceeds_second_is_suppressed() {
        let (mut reg, _clock) = registry();
        assert!(reg.try_begin("dispatch-5", TTL));
        assert!(!reg.try_begin("dispatch-5", TTL));
    }

    #[test]
    fn test_try_begin_allowed_again_after_expiry() {
        let (mut reg, clock) = registry();
        assert!(reg.try_begin("dispatch-5", TTL));
        clock.advance(TTL + Duration::from_millis(1));
        assert!(reg.try_begin("dispatch-5", TTL));
    }

    #[test]
    fn test_try_begin_suppression_does_not_extend_window() {
        // The duplicate path must not keep pushing the expiry out,
        // otherwise rapid retries would lock the key forever.
        let (mut reg, clock) = registry();
        assert!(reg.try_begin("k", TTL));

        clock.advance(Duration::from_millis(900));
        assert!(!reg.try_begin("k", TTL));

        clock.advance(Duration::from_millis(200));
        assert!(reg.try_begin("k", TTL));
    }

    // =====================================================================
    // Sweeping + teardown
    // =====================================================================

    #[test]
    fn test_mark_sweeps_expired_entries() {
        let (mut reg, clock) = registry();
        reg.mark("a", TTL);
        reg.mark("b", TTL);
        clock.advance(TTL * 2);

        reg.mark("c", TTL);

        assert_eq!(reg.len(), 1);
        assert!(reg.is_in_flight("c"));
    }

    #[test]
    fn test_purge_expired_drops_only_expired() {
        let (mut reg, clock) = registry();
        reg.mark("old", TTL);
        clock.advance(Duration::from_millis(600));
        reg.mark("young", TTL);
        clock.advance(Duration::from_millis(600));

        // "old" is 1200ms in, "young" only 600ms.
        reg.purge_expired();

        assert_eq!(reg.len(), 1);
        assert!(reg.is_in_flight("young"));
    }

    #[test]
    fn test_clear_cancels_everything() {
        let (mut reg, _clock) = registry();
        reg.mark("a", TTL);
        reg.mark("b", TTL);

        reg.clear();

        assert!(reg.is_empty());
        assert!(!reg.is_in_flight("a"));
    }

    // =====================================================================
    // Key builders
    // =====================================================================

    #[test]
    fn test_key_builders_embed_both_ids() {
        assert_eq!(play_key(PlayerId(3), CardId(12)), "play-3-12");
        assert_eq!(draw_key(PlayerId(3)), "draw-3");
        assert_eq!(dispatch_key(CardId(12)), "dispatch-12");
    }

    #[test]
    fn test_system_clock_registry_basic_flow() {
        // Smoke test for the default instantiation; timing-sensitive
        // cases use ManualClock above.
        let mut reg = InFlightRegistry::new();
        reg.mark("k", Duration::from_secs(60));
        assert!(reg.is_in_flight("k"));
        reg.clear();
        assert!(!reg.is_in_flight("k"));
    }
}
