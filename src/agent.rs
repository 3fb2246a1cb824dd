use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::cards::CardLedger;
use crate::config::Config;
use crate::cooldown::CooldownGuard;
use crate::dispatcher::CommandRegistry;
use crate::games::GameEngine;
use crate::ledger::Ledger;
use crate::metrics::Metrics;
use crate::moderation::ModerationGuard;
use crate::store::PersistentStore;
use crate::transport::{BoundedTransport, ChatTransport, InboundEvent};

pub struct ChatAgent {
    pub config: Config,
    pub transport: Arc<dyn ChatTransport>,
    pub ledger: Ledger,
    pub cards: CardLedger,
    pub moderation: ModerationGuard,
    pub games: GameEngine,
    pub cooldowns: CooldownGuard,
    pub metrics: Metrics,
    pub registry: CommandRegistry,
}

impl ChatAgent {
    /// Create a new agent with every service wired to the given transport.
    /// All transport calls go through the bounded wrapper so a stalled
    /// collaborator can never wedge the event loop.
    pub fn new(config: Config, transport: Arc<dyn ChatTransport>) -> Self {
        let transport: Arc<dyn ChatTransport> = Arc::new(BoundedTransport::new(transport));
        let data_dir = PathBuf::from(&config.data_dir);
        let ledger = Ledger::new(
            PersistentStore::new(data_dir.clone()),
            config.economy.clone(),
        );
        let cards = CardLedger::new(PersistentStore::new(data_dir));
        let moderation = ModerationGuard::new(transport.clone(), &config.moderation);
        let games = GameEngine::new(
            transport.clone(),
            Duration::from_secs(config.games.trivia_timeout_secs),
        );

        Self {
            config,
            transport,
            ledger,
            cards,
            moderation,
            games,
            cooldowns: CooldownGuard::new(),
            metrics: Metrics::new(),
            registry: CommandRegistry::new(),
        }
    }

    /// Main event loop: one logical consumer, each event handled to
    /// completion before the next. Scheduled timers are the only other
    /// writers, and they serialize on the per-service locks.
    pub async fn run(mut self, mut events: mpsc::Receiver<InboundEvent>) {
        info!("agent ready, entering main loop");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("event channel closed, agent stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ActorId, ConversationId, ConversationKind, MemoryTransport};

    #[tokio::test]
    async fn test_run_drains_channel_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default_local(None);
        config.data_dir = dir.path().to_string_lossy().to_string();
        config.command_cooldown_secs = 0;

        let transport = Arc::new(MemoryTransport::new());
        let agent = ChatAgent::new(config, transport.clone());

        let (tx, rx) = mpsc::channel(8);
        for i in 0..3 {
            tx.send(InboundEvent {
                message_id: format!("m{}", i),
                actor: ActorId("u1".into()),
                conversation: ConversationId("dm".into()),
                kind: ConversationKind::Direct,
                text: ".ping".into(),
                quoted: None,
            })
            .await
            .unwrap();
        }
        drop(tx);

        agent.run(rx).await;
        assert_eq!(transport.sent_count(), 3);
    }
}
