//! Chat transport boundary.
//!
//! The actual connection to the chat network (pairing, reconnects, message
//! framing) lives outside this crate. The core only sees the `ChatTransport`
//! trait: send a message, delete a message, read the live participant-role
//! snapshot of a group, and apply participant changes. Every call carries a
//! bounded timeout so a slow collaborator can never stall the dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Default upper bound for any single transport call.
pub const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stable identifier for a conversation participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    /// Parse an `@mention`-shaped argument into an actor id.
    pub fn from_mention(arg: &str) -> Option<Self> {
        let rest = arg.strip_prefix('@')?;
        if rest.is_empty() {
            return None;
        }
        Some(ActorId(rest.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a direct or multi-party chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// Reference to the message an inbound event was replying to.
#[derive(Debug, Clone)]
pub struct QuotedRef {
    pub author: ActorId,
    pub message_id: String,
}

/// One inbound conversation event, already normalized by the transport layer.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub message_id: String,
    pub actor: ActorId,
    pub conversation: ConversationId,
    pub kind: ConversationKind,
    pub text: String,
    pub quoted: Option<QuotedRef>,
}

impl InboundEvent {
    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Member,
    Admin,
    Owner,
}

impl ParticipantRole {
    pub fn is_admin(self) -> bool {
        matches!(self, ParticipantRole::Admin | ParticipantRole::Owner)
    }
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub actor: ActorId,
    pub role: ParticipantRole,
}

/// Group membership change delegated to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Remove,
    Promote,
    Demote,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport call timed out after {0:?}")]
    Timeout(Duration),
    #[error("conversation is not a group")]
    NotAGroup,
    #[error("transport failure: {0}")]
    Failed(String),
}

/// The excluded-collaborator boundary for the chat network.
///
/// Implementations must bound every call; callers treat all errors as
/// `CollaboratorFailure` and never retry.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text message, returning the new message's id.
    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<String, TransportError>;

    /// Delete a previously sent (or quoted) message.
    async fn delete_message(
        &self,
        conversation: &ConversationId,
        message_id: &str,
    ) -> Result<(), TransportError>;

    /// Live participant-role snapshot of a group. Never cached by the core.
    async fn participants(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Participant>, TransportError>;

    /// Remove/promote/demote a participant.
    async fn update_participant(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        change: RoleChange,
    ) -> Result<(), TransportError>;
}

/// Decorator bounding every call of the wrapped transport.
///
/// An elapsed deadline surfaces as `TransportError::Timeout`, which callers
/// treat like any other collaborator failure. This is what keeps a stalled
/// chat connection from wedging the dispatcher loop.
pub struct BoundedTransport {
    inner: Arc<dyn ChatTransport>,
    limit: Duration,
}

impl BoundedTransport {
    pub fn new(inner: Arc<dyn ChatTransport>) -> Self {
        Self::with_limit(inner, TRANSPORT_TIMEOUT)
    }

    pub fn with_limit(inner: Arc<dyn ChatTransport>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, TransportError>> + Send,
    ) -> Result<T, TransportError> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.limit)),
        }
    }
}

#[async_trait]
impl ChatTransport for BoundedTransport {
    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<String, TransportError> {
        self.bounded(self.inner.send_message(conversation, body)).await
    }

    async fn delete_message(
        &self,
        conversation: &ConversationId,
        message_id: &str,
    ) -> Result<(), TransportError> {
        self.bounded(self.inner.delete_message(conversation, message_id))
            .await
    }

    async fn participants(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Participant>, TransportError> {
        self.bounded(self.inner.participants(conversation)).await
    }

    async fn update_participant(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        change: RoleChange,
    ) -> Result<(), TransportError> {
        self.bounded(self.inner.update_participant(conversation, actor, change))
            .await
    }
}

/// In-memory transport that records all traffic.
///
/// Stands in for the live network in tests and in the local dry-run mode:
/// outbound messages, deletions and membership changes are captured instead
/// of hitting a real chat service.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(ConversationId, String, String)>>,
    deleted: Mutex<Vec<(ConversationId, String)>>,
    removed: Mutex<Vec<(ConversationId, ActorId)>>,
    promoted: Mutex<Vec<(ConversationId, ActorId)>>,
    demoted: Mutex<Vec<(ConversationId, ActorId)>>,
    roles: Mutex<HashMap<ConversationId, Vec<Participant>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the role snapshot returned for a group.
    pub fn set_participants(&self, conversation: ConversationId, participants: Vec<Participant>) {
        self.roles.lock().unwrap().insert(conversation, participants);
    }

    /// Bodies of every message sent so far, oldest first.
    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, body)| body.clone())
            .collect()
    }

    pub fn last_sent(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, _, body)| body.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn removed_actors(&self) -> Vec<ActorId> {
        self.removed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn promoted_actors(&self) -> Vec<ActorId> {
        self.promoted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn demoted_actors(&self) -> Vec<ActorId> {
        self.demoted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<String, TransportError> {
        let id = Uuid::new_v4().to_string();
        self.sent
            .lock()
            .unwrap()
            .push((conversation.clone(), id.clone(), body.to_string()));
        Ok(id)
    }

    async fn delete_message(
        &self,
        conversation: &ConversationId,
        message_id: &str,
    ) -> Result<(), TransportError> {
        self.deleted
            .lock()
            .unwrap()
            .push((conversation.clone(), message_id.to_string()));
        Ok(())
    }

    async fn participants(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Participant>, TransportError> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_participant(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        change: RoleChange,
    ) -> Result<(), TransportError> {
        let record = (conversation.clone(), actor.clone());
        match change {
            RoleChange::Remove => self.removed.lock().unwrap().push(record),
            RoleChange::Promote => self.promoted.lock().unwrap().push(record),
            RoleChange::Demote => self.demoted.lock().unwrap().push(record),
        }
        Ok(())
    }
}

/// Console transport for the local dev loop: replies go to stdout, group
/// operations are no-ops that only log.
pub struct StdioTransport;

#[async_trait]
impl ChatTransport for StdioTransport {
    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<String, TransportError> {
        println!("[chatwarden → {}]\n{}\n", conversation, body);
        Ok(Uuid::new_v4().to_string())
    }

    async fn delete_message(
        &self,
        conversation: &ConversationId,
        message_id: &str,
    ) -> Result<(), TransportError> {
        info!(conversation = %conversation, message_id = %message_id, "delete (console no-op)");
        Ok(())
    }

    async fn participants(
        &self,
        _conversation: &ConversationId,
    ) -> Result<Vec<Participant>, TransportError> {
        Ok(Vec::new())
    }

    async fn update_participant(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        change: RoleChange,
    ) -> Result<(), TransportError> {
        info!(conversation = %conversation, actor = %actor, change = ?change, "participant update (console no-op)");
        Ok(())
    }
}
