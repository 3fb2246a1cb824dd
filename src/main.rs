use clap::Parser;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::info;

use chatwarden::agent::ChatAgent;
use chatwarden::config::Config;
use chatwarden::transport::{
    ActorId, ConversationId, ConversationKind, InboundEvent, StdioTransport,
};

/// Chatwarden - command-driven automation agent for group chat networks
#[derive(Parser, Debug)]
#[command(name = "chatwarden", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Actor id treated as the bot owner
    #[arg(long)]
    owner: Option<String>,

    /// Directory for the persisted collections
    #[arg(long)]
    data_dir: Option<String>,

    /// Command prefix
    #[arg(long)]
    prefix: Option<String>,
}

#[tokio::main(flavor = "current_thread")] // single logical consumer
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default_local(args.owner.clone()),
    };
    if let Some(owner) = args.owner {
        config.owner = Some(owner);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(prefix) = args.prefix {
        config.prefix = prefix;
    }

    info!(
        bot_name = %config.bot_name,
        prefix = %config.prefix,
        data_dir = %config.data_dir,
        "🛡️ Chatwarden starting"
    );

    // Console transport: stdin lines become inbound events from the local
    // operator in one direct conversation, replies print to stdout. The live
    // chat-network transport plugs in through the same channel + trait.
    let console_actor = config
        .owner
        .clone()
        .unwrap_or_else(|| "local-operator".to_string());
    let transport = Arc::new(StdioTransport);
    let agent = ChatAgent::new(config, transport);

    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        let mut seq: u64 = 0;
        while let Ok(Some(line)) = lines.next_line().await {
            seq += 1;
            let event = InboundEvent {
                message_id: format!("console-{}", seq),
                actor: ActorId(console_actor.clone()),
                conversation: ConversationId("console".to_string()),
                kind: ConversationKind::Direct,
                text: line,
                quoted: None,
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    agent.run(rx).await;
    Ok(())
}
