//! Role-gated group moderation with warning escalation and timed mutes.
//!
//! State is keyed by (conversation, target) and lives in memory only: the
//! explicit contract is clear-on-restart, matching the transient nature of
//! mutes and pending escalations. Role checks always read the live
//! participant snapshot from the transport, never a cache.
//!
//! Escalation: the third warning schedules an automatic kick after a short
//! grace delay so the warning notice lands first. The timer re-reads the
//! warning count when it fires and aborts if an admin cleared the record in
//! the meantime, which is the pardon path for the escalation window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ModerationConfig;
use crate::error::CommandError;
use crate::scheduler::{self, TaskHandle};
use crate::transport::{ActorId, ChatTransport, ConversationId, RoleChange};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub reason: String,
    pub issued_at: DateTime<Utc>,
    pub issued_by: ActorId,
}

#[derive(Debug, Default)]
struct TargetState {
    mute_until: Option<DateTime<Utc>>,
    warnings: Vec<Warning>,
}

impl TargetState {
    fn is_empty(&self) -> bool {
        self.mute_until.is_none() && self.warnings.is_empty()
    }
}

type Key = (String, String);

fn key_of(conversation: &ConversationId, target: &ActorId) -> Key {
    (
        conversation.as_str().to_string(),
        target.as_str().to_string(),
    )
}

#[derive(Default)]
struct GuardState {
    targets: HashMap<Key, TargetState>,
    unmute_timers: HashMap<Key, TaskHandle>,
}

impl GuardState {
    /// Drop a target entry once it carries no state at all.
    fn prune(&mut self, key: &Key) {
        if self.targets.get(key).map(|t| t.is_empty()).unwrap_or(false) {
            self.targets.remove(key);
        }
    }
}

#[derive(Debug, Clone)]
pub struct WarnOutcome {
    pub count: usize,
    pub limit: usize,
    pub escalated: bool,
}

pub struct ModerationGuard {
    inner: Arc<Mutex<GuardState>>,
    transport: Arc<dyn ChatTransport>,
    warn_limit: usize,
    autokick_delay: Duration,
}

impl ModerationGuard {
    pub fn new(transport: Arc<dyn ChatTransport>, config: &ModerationConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GuardState::default())),
            transport,
            warn_limit: config.warn_limit,
            autokick_delay: Duration::from_millis(config.autokick_delay_ms),
        }
    }

    /// Role check against the live participant snapshot. The bot owner
    /// bypasses the group role requirement.
    pub async fn require_admin(
        &self,
        conversation: &ConversationId,
        caller: &ActorId,
        caller_is_owner: bool,
    ) -> Result<(), CommandError> {
        if caller_is_owner {
            return Ok(());
        }
        let participants = self.transport.participants(conversation).await?;
        let is_admin = participants
            .iter()
            .any(|p| p.actor == *caller && p.role.is_admin());
        if is_admin {
            Ok(())
        } else {
            Err(CommandError::Permission)
        }
    }

    async fn target_is_admin(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
    ) -> Result<bool, CommandError> {
        let participants = self.transport.participants(conversation).await?;
        Ok(participants
            .iter()
            .any(|p| p.actor == *target && p.role.is_admin()))
    }

    /// Remove a target from the group. Admins cannot be kicked.
    pub async fn kick(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
    ) -> Result<(), CommandError> {
        if self.target_is_admin(conversation, target).await? {
            return Err(CommandError::NotGroupAdmin);
        }
        self.transport
            .update_participant(conversation, target, RoleChange::Remove)
            .await?;
        info!(conversation = %conversation, target = %target, "participant kicked");
        Ok(())
    }

    pub async fn promote(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
    ) -> Result<(), CommandError> {
        self.transport
            .update_participant(conversation, target, RoleChange::Promote)
            .await?;
        Ok(())
    }

    pub async fn demote(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
    ) -> Result<(), CommandError> {
        self.transport
            .update_participant(conversation, target, RoleChange::Demote)
            .await?;
        Ok(())
    }

    /// Mute a target for `duration` and schedule the auto-unmute notice.
    /// A new mute supersedes a pending one: the old timer is cancelled.
    pub fn mute(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), CommandError> {
        let until = now
            + chrono::Duration::from_std(duration)
                .map_err(|e| CommandError::Internal(e.to_string()))?;
        let key = key_of(conversation, target);

        let mut state = self.inner.lock().unwrap();
        state.targets.entry(key.clone()).or_default().mute_until = Some(until);

        let timer = {
            let inner = self.inner.clone();
            let transport = self.transport.clone();
            let conversation = conversation.clone();
            let target = target.clone();
            let timer_key = key.clone();
            scheduler::schedule(duration, async move {
                let expired = {
                    let mut state = inner.lock().unwrap();
                    state.unmute_timers.remove(&timer_key);
                    let expired = state
                        .targets
                        .get(&timer_key)
                        .and_then(|t| t.mute_until)
                        .map(|until| until <= Utc::now())
                        .unwrap_or(false);
                    if expired {
                        if let Some(t) = state.targets.get_mut(&timer_key) {
                            t.mute_until = None;
                        }
                        state.prune(&timer_key);
                    }
                    expired
                };
                if expired {
                    let notice = format!("🔊 @{} has been automatically unmuted.", target);
                    if let Err(e) = transport.send_message(&conversation, &notice).await {
                        warn!(error = %e, "failed to announce auto-unmute");
                    }
                }
            })
        };

        if let Some(old) = state.unmute_timers.insert(key, timer) {
            old.cancel();
        }
        info!(conversation = %conversation, target = %target, until = %until, "participant muted");
        Ok(())
    }

    /// Lift a mute before it expires. Cancels the pending auto-unmute.
    pub fn unmute(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<(), CommandError> {
        let key = key_of(conversation, target);
        let mut state = self.inner.lock().unwrap();

        let active = state
            .targets
            .get(&key)
            .and_then(|t| t.mute_until)
            .map(|until| until > now)
            .unwrap_or(false);
        if !active {
            return Err(CommandError::Usage("that user is not currently muted".into()));
        }

        if let Some(t) = state.targets.get_mut(&key) {
            t.mute_until = None;
        }
        state.prune(&key);
        if let Some(timer) = state.unmute_timers.remove(&key) {
            timer.cancel();
        }
        Ok(())
    }

    /// Lazy expiry: an elapsed mute is removed on the next lookup, no
    /// background sweep involved.
    pub fn is_muted(&self, conversation: &ConversationId, actor: &ActorId, now: DateTime<Utc>) -> bool {
        let key = key_of(conversation, actor);
        let mut state = self.inner.lock().unwrap();
        match state.targets.get(&key).and_then(|t| t.mute_until) {
            Some(until) if until > now => true,
            Some(_) => {
                if let Some(t) = state.targets.get_mut(&key) {
                    t.mute_until = None;
                }
                state.prune(&key);
                false
            }
            None => false,
        }
    }

    /// Record a warning. Reaching the limit schedules the automatic kick
    /// after the grace delay; the count is re-checked when the timer fires.
    pub fn warn(
        &self,
        conversation: &ConversationId,
        target: &ActorId,
        reason: String,
        issued_by: &ActorId,
        now: DateTime<Utc>,
    ) -> WarnOutcome {
        let key = key_of(conversation, target);
        let count = {
            let mut state = self.inner.lock().unwrap();
            let entry = state.targets.entry(key.clone()).or_default();
            entry.warnings.push(Warning {
                reason,
                issued_at: now,
                issued_by: issued_by.clone(),
            });
            entry.warnings.len()
        };

        let escalated = count == self.warn_limit;
        if escalated {
            let inner = self.inner.clone();
            let transport = self.transport.clone();
            let conversation = conversation.clone();
            let target = target.clone();
            let warn_limit = self.warn_limit;
            scheduler::schedule(self.autokick_delay, async move {
                let still_due = {
                    let state = inner.lock().unwrap();
                    state
                        .targets
                        .get(&key)
                        .map(|t| t.warnings.len() >= warn_limit)
                        .unwrap_or(false)
                };
                if !still_due {
                    info!(conversation = %conversation, target = %target, "auto-kick aborted, warnings cleared during grace window");
                    return;
                }

                match transport
                    .update_participant(&conversation, &target, RoleChange::Remove)
                    .await
                {
                    Ok(()) => {
                        {
                            let mut state = inner.lock().unwrap();
                            if let Some(t) = state.targets.get_mut(&key) {
                                t.warnings.clear();
                            }
                            state.prune(&key);
                        }
                        let notice = format!(
                            "🚫 @{} has been automatically removed after {} warnings.",
                            target, warn_limit
                        );
                        if let Err(e) = transport.send_message(&conversation, &notice).await {
                            warn!(error = %e, "failed to announce auto-kick");
                        }
                    }
                    // No retry: deferred moderation actions fail quietly
                    Err(e) => {
                        warn!(conversation = %conversation, target = %target, error = %e, "auto-kick failed")
                    }
                }
            });
        }

        WarnOutcome {
            count,
            limit: self.warn_limit,
            escalated,
        }
    }

    pub fn warnings(&self, conversation: &ConversationId, target: &ActorId) -> Vec<Warning> {
        let state = self.inner.lock().unwrap();
        state
            .targets
            .get(&key_of(conversation, target))
            .map(|t| t.warnings.clone())
            .unwrap_or_default()
    }

    /// Explicit warning reset; also the pardon path for a pending auto-kick.
    pub fn clear_warnings(&self, conversation: &ConversationId, target: &ActorId) -> usize {
        let key = key_of(conversation, target);
        let mut state = self.inner.lock().unwrap();
        let cleared = state
            .targets
            .get_mut(&key)
            .map(|t| std::mem::take(&mut t.warnings).len())
            .unwrap_or(0);
        state.prune(&key);
        cleared
    }

    /// (muted targets, warned targets) for the stats report.
    pub fn counts(&self, now: DateTime<Utc>) -> (usize, usize) {
        let state = self.inner.lock().unwrap();
        let muted = state
            .targets
            .values()
            .filter(|t| t.mute_until.map(|u| u > now).unwrap_or(false))
            .count();
        let warned = state
            .targets
            .values()
            .filter(|t| !t.warnings.is_empty())
            .count();
        (muted, warned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, Participant, ParticipantRole};

    fn setup(delay_ms: u64) -> (ModerationGuard, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let config = ModerationConfig {
            warn_limit: 3,
            autokick_delay_ms: delay_ms,
            default_mute_minutes: 60,
        };
        let guard = ModerationGuard::new(transport.clone(), &config);
        (guard, transport)
    }

    fn conv(id: &str) -> ConversationId {
        ConversationId(id.to_string())
    }

    fn actor(id: &str) -> ActorId {
        ActorId(id.to_string())
    }

    fn admin_snapshot(transport: &MemoryTransport, c: &ConversationId) {
        transport.set_participants(
            c.clone(),
            vec![
                Participant {
                    actor: actor("admin"),
                    role: ParticipantRole::Admin,
                },
                Participant {
                    actor: actor("member"),
                    role: ParticipantRole::Member,
                },
            ],
        );
    }

    #[tokio::test]
    async fn test_require_admin() {
        let (guard, transport) = setup(50);
        let c = conv("g1");
        admin_snapshot(&transport, &c);

        assert!(guard.require_admin(&c, &actor("admin"), false).await.is_ok());
        assert!(matches!(
            guard.require_admin(&c, &actor("member"), false).await,
            Err(CommandError::Permission)
        ));
        // Owner bypasses the group role requirement
        assert!(guard.require_admin(&c, &actor("member"), true).await.is_ok());
    }

    #[tokio::test]
    async fn test_kick_rejects_admin_target() {
        let (guard, transport) = setup(50);
        let c = conv("g1");
        admin_snapshot(&transport, &c);

        assert!(matches!(
            guard.kick(&c, &actor("admin")).await,
            Err(CommandError::NotGroupAdmin)
        ));
        assert!(transport.removed_actors().is_empty());

        guard.kick(&c, &actor("member")).await.unwrap();
        assert_eq!(transport.removed_actors(), vec![actor("member")]);
    }

    #[tokio::test]
    async fn test_mute_lazy_expiry() {
        let (guard, _transport) = setup(50);
        let c = conv("g1");
        let t = actor("member");
        let now = Utc::now();

        guard.mute(&c, &t, Duration::from_secs(60), now).unwrap();
        assert!(guard.is_muted(&c, &t, now));

        // A lookup past the deadline expires and removes the record
        let later = now + chrono::Duration::seconds(61);
        assert!(!guard.is_muted(&c, &t, later));
        assert_eq!(guard.counts(later).0, 0);
    }

    #[tokio::test]
    async fn test_auto_unmute_notice() {
        let (guard, transport) = setup(50);
        let c = conv("g1");
        let t = actor("member");

        guard
            .mute(&c, &t, Duration::from_millis(40), Utc::now())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(!guard.is_muted(&c, &t, Utc::now()));
        let bodies = transport.sent_bodies();
        assert!(bodies.iter().any(|b| b.contains("automatically unmuted")));
    }

    #[tokio::test]
    async fn test_manual_unmute_cancels_timer() {
        let (guard, transport) = setup(50);
        let c = conv("g1");
        let t = actor("member");
        let now = Utc::now();

        guard.mute(&c, &t, Duration::from_millis(40), now).unwrap();
        guard.unmute(&c, &t, now).unwrap();
        assert!(!guard.is_muted(&c, &t, now));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(transport.sent_bodies().is_empty());
    }

    #[tokio::test]
    async fn test_unmute_without_mute_is_usage_error() {
        let (guard, _transport) = setup(50);
        assert!(matches!(
            guard.unmute(&conv("g1"), &actor("member"), Utc::now()),
            Err(CommandError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_warning_escalation_kicks_once() {
        let (guard, transport) = setup(30);
        let c = conv("g1");
        let t = actor("member");
        let admin = actor("admin");
        admin_snapshot(&transport, &c);

        let first = guard.warn(&c, &t, "spam".into(), &admin, Utc::now());
        assert_eq!((first.count, first.escalated), (1, false));
        let second = guard.warn(&c, &t, "spam again".into(), &admin, Utc::now());
        assert_eq!((second.count, second.escalated), (2, false));
        let third = guard.warn(&c, &t, "last straw".into(), &admin, Utc::now());
        assert_eq!((third.count, third.escalated), (3, true));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(transport.removed_actors(), vec![t.clone()]);
        // Record cleared after the kick fired
        assert!(guard.warnings(&c, &t).is_empty());
    }

    #[tokio::test]
    async fn test_pardon_during_grace_window_aborts_kick() {
        let (guard, transport) = setup(60);
        let c = conv("g1");
        let t = actor("member");
        let admin = actor("admin");

        for reason in ["one", "two", "three"] {
            guard.warn(&c, &t, reason.into(), &admin, Utc::now());
        }
        assert_eq!(guard.clear_warnings(&c, &t), 3);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(transport.removed_actors().is_empty());
    }

    #[tokio::test]
    async fn test_warnings_listing_and_clear() {
        let (guard, _transport) = setup(1000);
        let c = conv("g1");
        let t = actor("member");
        let admin = actor("admin");

        guard.warn(&c, &t, "flooding".into(), &admin, Utc::now());
        guard.warn(&c, &t, "links".into(), &admin, Utc::now());

        let listed = guard.warnings(&c, &t);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].reason, "flooding");
        assert_eq!(listed[1].issued_by, admin);

        assert_eq!(guard.clear_warnings(&c, &t), 2);
        assert!(guard.warnings(&c, &t).is_empty());
        // Clearing twice is harmless
        assert_eq!(guard.clear_warnings(&c, &t), 0);
    }

    #[tokio::test]
    async fn test_mute_and_warnings_are_per_conversation() {
        let (guard, _transport) = setup(1000);
        let t = actor("member");
        let admin = actor("admin");
        let now = Utc::now();

        guard
            .mute(&conv("g1"), &t, Duration::from_secs(60), now)
            .unwrap();
        guard.warn(&conv("g2"), &t, "elsewhere".into(), &admin, now);

        assert!(guard.is_muted(&conv("g1"), &t, now));
        assert!(!guard.is_muted(&conv("g2"), &t, now));
        assert_eq!(guard.warnings(&conv("g1"), &t).len(), 0);
        assert_eq!(guard.warnings(&conv("g2"), &t).len(), 1);
    }
}
