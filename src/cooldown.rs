//! Per-actor, per-action timestamp gate.
//!
//! Purely in-memory: cooldown state clears on restart by design. Persistent
//! rate limits (daily claim, card claim, activity timers) live on the owning
//! records instead.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::transport::ActorId;

/// Actions gated by the in-memory guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// The global gate between any two commands from the same actor.
    Command,
    /// Group-wide announcements get their own, longer gate.
    Tagall,
}

pub struct CooldownGuard {
    entries: Mutex<HashMap<(ActorId, ActionKind), Instant>>,
}

impl Default for CooldownGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownGuard {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Check the gate for `(actor, action)`. If the window has elapsed the
    /// use is recorded and `Ok(())` is returned; otherwise the remaining wait
    /// comes back and nothing is recorded.
    pub fn check(
        &self,
        actor: &ActorId,
        action: ActionKind,
        window: Duration,
    ) -> Result<(), Duration> {
        if window.is_zero() {
            return Ok(());
        }

        let mut entries = self.entries.lock().unwrap();
        let key = (actor.clone(), action);
        let now = Instant::now();

        if let Some(last) = entries.get(&key) {
            let elapsed = now.duration_since(*last);
            if elapsed < window {
                return Err(window - elapsed);
            }
        }

        entries.insert(key, now);
        Ok(())
    }

    /// Drop all gates for an actor.
    pub fn clear(&self, actor: &ActorId) {
        self.entries
            .lock()
            .unwrap()
            .retain(|(a, _), _| a != actor);
    }

    pub fn active_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str) -> ActorId {
        ActorId(id.to_string())
    }

    #[test]
    fn test_first_use_passes() {
        let guard = CooldownGuard::new();
        assert!(guard
            .check(&actor("a1"), ActionKind::Command, Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn test_second_use_within_window_blocked() {
        let guard = CooldownGuard::new();
        let window = Duration::from_secs(60);
        guard.check(&actor("a1"), ActionKind::Command, window).unwrap();

        let remaining = guard
            .check(&actor("a1"), ActionKind::Command, window)
            .unwrap_err();
        assert!(remaining <= window);
        assert!(remaining > Duration::from_secs(55));
    }

    #[test]
    fn test_actions_are_independent() {
        let guard = CooldownGuard::new();
        let window = Duration::from_secs(60);
        guard.check(&actor("a1"), ActionKind::Command, window).unwrap();
        assert!(guard.check(&actor("a1"), ActionKind::Tagall, window).is_ok());
    }

    #[test]
    fn test_actors_are_independent() {
        let guard = CooldownGuard::new();
        let window = Duration::from_secs(60);
        guard.check(&actor("a1"), ActionKind::Command, window).unwrap();
        assert!(guard.check(&actor("a2"), ActionKind::Command, window).is_ok());
    }

    #[test]
    fn test_zero_window_always_passes() {
        let guard = CooldownGuard::new();
        for _ in 0..5 {
            assert!(guard
                .check(&actor("a1"), ActionKind::Command, Duration::ZERO)
                .is_ok());
        }
    }

    #[test]
    fn test_clear_resets_actor() {
        let guard = CooldownGuard::new();
        let window = Duration::from_secs(60);
        guard.check(&actor("a1"), ActionKind::Command, window).unwrap();
        guard.check(&actor("a1"), ActionKind::Tagall, window).unwrap();
        guard.check(&actor("a2"), ActionKind::Command, window).unwrap();
        assert_eq!(guard.active_count(), 3);

        guard.clear(&actor("a1"));
        assert_eq!(guard.active_count(), 1);
        assert!(guard.check(&actor("a1"), ActionKind::Command, window).is_ok());
    }
}
