use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display name used in replies and logs
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Command prefix token (single token, default ".")
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Actor id of the bot owner (owner-only commands, admin bypass)
    #[serde(default)]
    pub owner: Option<String>,

    /// Directory holding the persisted collections
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Minimum seconds between any two commands from the same actor
    #[serde(default = "default_command_cooldown_secs")]
    pub command_cooldown_secs: u64,

    /// Public: everyone may run commands. Private: owner only.
    #[serde(default)]
    pub mode: BotMode,

    #[serde(default)]
    pub economy: EconomyConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub games: GamesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BotMode {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Balance granted on first reference to an account
    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,

    /// Inclusive bounds of the random daily-claim base reward
    #[serde(default = "default_daily_base_min")]
    pub daily_base_min: i64,
    #[serde(default = "default_daily_base_max")]
    pub daily_base_max: i64,

    /// Win probability for a gamble
    #[serde(default = "default_gamble_win_chance")]
    pub gamble_win_chance: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            daily_base_min: default_daily_base_min(),
            daily_base_max: default_daily_base_max(),
            gamble_win_chance: default_gamble_win_chance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Warning count that triggers the automatic kick
    #[serde(default = "default_warn_limit")]
    pub warn_limit: usize,

    /// Grace delay before the automatic kick fires
    #[serde(default = "default_autokick_delay_ms")]
    pub autokick_delay_ms: u64,

    /// Mute duration when the admin gives none
    #[serde(default = "default_mute_minutes")]
    pub default_mute_minutes: i64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            warn_limit: default_warn_limit(),
            autokick_delay_ms: default_autokick_delay_ms(),
            default_mute_minutes: default_mute_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    /// Wall-clock timeout for an unanswered trivia question
    #[serde(default = "default_trivia_timeout_secs")]
    pub trivia_timeout_secs: u64,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            trivia_timeout_secs: default_trivia_timeout_secs(),
        }
    }
}

fn default_bot_name() -> String {
    "chatwarden".to_string()
}

fn default_prefix() -> String {
    ".".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_command_cooldown_secs() -> u64 {
    3
}

fn default_starting_balance() -> i64 {
    1000
}

fn default_daily_base_min() -> i64 {
    100
}

fn default_daily_base_max() -> i64 {
    599
}

fn default_gamble_win_chance() -> f64 {
    0.45
}

fn default_warn_limit() -> usize {
    3
}

fn default_autokick_delay_ms() -> u64 {
    2000
}

fn default_mute_minutes() -> i64 {
    60
}

fn default_trivia_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(bot_name = %config.bot_name, prefix = %config.prefix, "configuration loaded");
        Ok(config)
    }

    /// Default configuration for a local run.
    pub fn default_local(owner: Option<String>) -> Self {
        Self {
            bot_name: default_bot_name(),
            prefix: default_prefix(),
            owner,
            data_dir: default_data_dir(),
            command_cooldown_secs: default_command_cooldown_secs(),
            mode: BotMode::Public,
            economy: EconomyConfig::default(),
            moderation: ModerationConfig::default(),
            games: GamesConfig::default(),
        }
    }

    pub fn is_owner(&self, actor: &crate::transport::ActorId) -> bool {
        self.owner.as_deref() == Some(actor.as_str())
    }
}
