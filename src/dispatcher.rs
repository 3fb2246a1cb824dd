//! Command registry and event dispatch.
//!
//! Commands live in a static registry: name, aliases, required arity, access
//! level, group-only flag and usage hint. The registry is validated when it
//! is built (duplicate names panic at startup, not at dispatch time), and
//! routing is an exhaustive match over the command kind.
//!
//! The gating pipeline for every inbound event: muted-actor drop → prefix
//! parse → registry lookup (unknown commands are silently ignored) → private
//! mode → global cooldown → arity → group-only → access. Each handler is a
//! failure boundary: domain errors map to their fixed reply, anything
//! unexpected becomes one generic failure message and a counter bump; the
//! event loop itself never dies.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::agent::ChatAgent;
use crate::cards;
use crate::config::BotMode;
use crate::cooldown::ActionKind;
use crate::error::{format_remaining, CommandError};
use crate::ledger::{ActivityKind, AmountArg, ProfileField};
use crate::scheduler;
use crate::transport::{ActorId, InboundEvent};

/// Gate between two group-wide announcements from the same actor
const TAGALL_COOLDOWN: Duration = Duration::from_secs(60);

/// How long a delete-confirmation stays before it removes itself
const CONFIRMATION_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    Ping,
    // economy
    Balance,
    Daily,
    Profile,
    Gamble,
    Deposit,
    Withdraw,
    Donate,
    Leaderboard,
    Lottery,
    Dig,
    Fish,
    Beg,
    Edit,
    // cards
    Claim,
    Deck,
    Card,
    Cards,
    SeriesInfo,
    CardLeaderboard,
    // games
    TicTacToe,
    Hangman,
    Trivia,
    EightBall,
    CoinFlip,
    Dice,
    // moderation
    Kick,
    Promote,
    Demote,
    Mute,
    Unmute,
    Warn,
    Warnings,
    ClearWarns,
    TagAll,
    Delete,
    // owner
    Mode,
    Stats,
    ResetSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Any,
    Admin,
    Owner,
}

/// One registry entry: everything the pipeline needs before routing.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub command: Command,
    pub min_args: usize,
    pub access: Access,
    pub group_only: bool,
    pub usage: &'static str,
    pub description: &'static str,
}

const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec { name: "help", aliases: &[], command: Command::Help, min_args: 0, access: Access::Any, group_only: false, usage: "help", description: "List available commands" },
    CommandSpec { name: "ping", aliases: &[], command: Command::Ping, min_args: 0, access: Access::Any, group_only: false, usage: "ping", description: "Check the agent is alive" },
    // economy
    CommandSpec { name: "balance", aliases: &["bal"], command: Command::Balance, min_args: 0, access: Access::Any, group_only: false, usage: "balance [@user]", description: "Show wallet and bank balance" },
    CommandSpec { name: "daily", aliases: &[], command: Command::Daily, min_args: 0, access: Access::Any, group_only: false, usage: "daily", description: "Claim the daily reward" },
    CommandSpec { name: "profile", aliases: &[], command: Command::Profile, min_args: 0, access: Access::Any, group_only: false, usage: "profile [@user]", description: "Show a user profile" },
    CommandSpec { name: "gamble", aliases: &["bet"], command: Command::Gamble, min_args: 1, access: Access::Any, group_only: false, usage: "gamble [amount|all]", description: "Gamble part of your balance" },
    CommandSpec { name: "deposit", aliases: &["dep"], command: Command::Deposit, min_args: 1, access: Access::Any, group_only: false, usage: "deposit [amount|all]", description: "Move funds into the bank" },
    CommandSpec { name: "withdraw", aliases: &["wd"], command: Command::Withdraw, min_args: 1, access: Access::Any, group_only: false, usage: "withdraw [amount|all]", description: "Move funds out of the bank" },
    CommandSpec { name: "donate", aliases: &["transfer"], command: Command::Donate, min_args: 2, access: Access::Any, group_only: false, usage: "donate [@user] [amount]", description: "Give funds to another user" },
    CommandSpec { name: "leaderboard", aliases: &["rich", "lb"], command: Command::Leaderboard, min_args: 0, access: Access::Any, group_only: false, usage: "leaderboard", description: "Top users by net worth" },
    CommandSpec { name: "lottery", aliases: &[], command: Command::Lottery, min_args: 0, access: Access::Any, group_only: false, usage: "lottery", description: "Buy a lottery ticket" },
    CommandSpec { name: "dig", aliases: &[], command: Command::Dig, min_args: 0, access: Access::Any, group_only: false, usage: "dig", description: "Dig for treasure (hourly)" },
    CommandSpec { name: "fish", aliases: &[], command: Command::Fish, min_args: 0, access: Access::Any, group_only: false, usage: "fish", description: "Go fishing (every 45 min)" },
    CommandSpec { name: "beg", aliases: &[], command: Command::Beg, min_args: 0, access: Access::Any, group_only: false, usage: "beg", description: "Beg for coins (every 30 min)" },
    CommandSpec { name: "edit", aliases: &[], command: Command::Edit, min_args: 2, access: Access::Any, group_only: false, usage: "edit [bio|age|status] [value]", description: "Edit your profile" },
    // cards
    CommandSpec { name: "claim", aliases: &[], command: Command::Claim, min_args: 0, access: Access::Any, group_only: false, usage: "claim", description: "Claim a card (every 3 h)" },
    CommandSpec { name: "deck", aliases: &[], command: Command::Deck, min_args: 0, access: Access::Any, group_only: false, usage: "deck", description: "Show your card deck" },
    CommandSpec { name: "card", aliases: &[], command: Command::Card, min_args: 1, access: Access::Any, group_only: false, usage: "card [index]", description: "Inspect a card in your deck" },
    CommandSpec { name: "cards", aliases: &[], command: Command::Cards, min_args: 1, access: Access::Any, group_only: false, usage: "cards [on|off]", description: "Toggle the cards feature" },
    CommandSpec { name: "si", aliases: &["seriesinfo"], command: Command::SeriesInfo, min_args: 1, access: Access::Any, group_only: false, usage: "si [series]", description: "Show a card series" },
    CommandSpec { name: "cardlb", aliases: &[], command: Command::CardLeaderboard, min_args: 0, access: Access::Any, group_only: false, usage: "cardlb", description: "Top collectors by deck value" },
    // games
    CommandSpec { name: "ttt", aliases: &["tictactoe"], command: Command::TicTacToe, min_args: 0, access: Access::Any, group_only: false, usage: "ttt [1-9]", description: "Play tic-tac-toe" },
    CommandSpec { name: "hangman", aliases: &["hm"], command: Command::Hangman, min_args: 0, access: Access::Any, group_only: false, usage: "hangman [letter|word]", description: "Play hangman" },
    CommandSpec { name: "trivia", aliases: &[], command: Command::Trivia, min_args: 0, access: Access::Any, group_only: false, usage: "trivia", description: "Ask a trivia question" },
    CommandSpec { name: "8ball", aliases: &[], command: Command::EightBall, min_args: 1, access: Access::Any, group_only: false, usage: "8ball [question]", description: "Ask the magic 8-ball" },
    CommandSpec { name: "coinflip", aliases: &["flip"], command: Command::CoinFlip, min_args: 0, access: Access::Any, group_only: false, usage: "coinflip", description: "Flip a coin" },
    CommandSpec { name: "dice", aliases: &[], command: Command::Dice, min_args: 0, access: Access::Any, group_only: false, usage: "dice [count]", description: "Roll up to 6 dice" },
    // moderation
    CommandSpec { name: "kick", aliases: &[], command: Command::Kick, min_args: 0, access: Access::Admin, group_only: true, usage: "kick [@user] — or reply to their message", description: "Remove a member" },
    CommandSpec { name: "promote", aliases: &[], command: Command::Promote, min_args: 0, access: Access::Admin, group_only: true, usage: "promote [@user] — or reply to their message", description: "Promote a member to admin" },
    CommandSpec { name: "demote", aliases: &[], command: Command::Demote, min_args: 0, access: Access::Admin, group_only: true, usage: "demote [@user] — or reply to their message", description: "Demote an admin" },
    CommandSpec { name: "mute", aliases: &[], command: Command::Mute, min_args: 0, access: Access::Admin, group_only: true, usage: "mute [minutes] [@user] — or reply to their message", description: "Mute a member" },
    CommandSpec { name: "unmute", aliases: &[], command: Command::Unmute, min_args: 0, access: Access::Admin, group_only: true, usage: "unmute [@user] — or reply to their message", description: "Lift a mute early" },
    CommandSpec { name: "warn", aliases: &[], command: Command::Warn, min_args: 0, access: Access::Admin, group_only: true, usage: "warn [@user] [reason] — or reply to their message", description: "Issue a warning" },
    CommandSpec { name: "warnings", aliases: &[], command: Command::Warnings, min_args: 0, access: Access::Any, group_only: true, usage: "warnings [@user] — or reply to their message", description: "List a member's warnings" },
    CommandSpec { name: "clearwarns", aliases: &["unwarn"], command: Command::ClearWarns, min_args: 0, access: Access::Admin, group_only: true, usage: "clearwarns [@user] — or reply to their message", description: "Clear a member's warnings" },
    CommandSpec { name: "tagall", aliases: &[], command: Command::TagAll, min_args: 0, access: Access::Admin, group_only: true, usage: "tagall [message]", description: "Mention every member" },
    CommandSpec { name: "del", aliases: &["delete"], command: Command::Delete, min_args: 0, access: Access::Admin, group_only: true, usage: "reply to a message with del", description: "Delete the quoted message" },
    // owner
    CommandSpec { name: "mode", aliases: &[], command: Command::Mode, min_args: 1, access: Access::Owner, group_only: false, usage: "mode [public|private]", description: "Switch the serving mode" },
    CommandSpec { name: "stats", aliases: &[], command: Command::Stats, min_args: 0, access: Access::Owner, group_only: false, usage: "stats", description: "Operational statistics" },
    CommandSpec { name: "resetsession", aliases: &[], command: Command::ResetSession, min_args: 0, access: Access::Owner, group_only: false, usage: "resetsession", description: "Terminate for a supervised restart" },
];

/// Name/alias → descriptor lookup, validated at construction.
pub struct CommandRegistry {
    by_name: HashMap<&'static str, &'static CommandSpec>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut by_name: HashMap<&'static str, &'static CommandSpec> = HashMap::new();
        for spec in COMMAND_SPECS {
            for name in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
                let previous = by_name.insert(*name, spec);
                assert!(previous.is_none(), "duplicate command name: {}", name);
            }
        }
        Self { by_name }
    }

    /// Case-insensitive lookup by name or alias.
    pub fn resolve(&self, name: &str) -> Option<&'static CommandSpec> {
        self.by_name
            .get(name.to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn specs(&self) -> &'static [CommandSpec] {
        COMMAND_SPECS
    }
}

/// Split `<prefix><name> args...` into a lowercase name and its args.
/// Returns `None` for anything that is not a command invocation.
pub fn parse_invocation<'a>(prefix: &str, text: &'a str) -> Option<(String, Vec<&'a str>)> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_ascii_lowercase();
    Some((name, parts.collect()))
}

fn parse_amount(arg: &str) -> Result<AmountArg, CommandError> {
    if arg.eq_ignore_ascii_case("all") {
        return Ok(AmountArg::All);
    }
    arg.parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .map(AmountArg::Exact)
        .ok_or(CommandError::InvalidStake)
}

/// Moderation target resolution: the quoted message's author first, then the
/// first `@mention`-shaped argument. Returns the target and how many leading
/// args were consumed by it.
fn resolve_target(event: &InboundEvent, args: &[&str]) -> Option<(ActorId, usize)> {
    if let Some(quoted) = &event.quoted {
        return Some((quoted.author.clone(), 0));
    }
    for (i, arg) in args.iter().enumerate() {
        if let Some(target) = ActorId::from_mention(arg) {
            return Some((target, i + 1));
        }
    }
    None
}

pub type CommandReply = Result<Option<String>, CommandError>;

impl ChatAgent {
    /// Entry point for one inbound conversation event.
    pub async fn handle_event(&mut self, event: InboundEvent) {
        self.metrics.events_total += 1;
        if event.text.trim().is_empty() {
            return;
        }
        let now = Utc::now();

        // Muted actors are dropped silently; their message is removed best-effort.
        if event.is_group() && self.moderation.is_muted(&event.conversation, &event.actor, now) {
            self.metrics.muted_dropped += 1;
            if let Err(e) = self
                .transport
                .delete_message(&event.conversation, &event.message_id)
                .await
            {
                warn!(conversation = %event.conversation, error = %e, "failed to remove muted actor's message");
            }
            return;
        }

        let (name, args) = match parse_invocation(&self.config.prefix, &event.text) {
            Some(parsed) => parsed,
            None => {
                // Bare A-D replies may answer an open trivia question
                if let Some(reply) =
                    self.games
                        .try_answer(&event.conversation, &event.actor, &event.text)
                {
                    self.send(&event, &reply).await;
                }
                return;
            }
        };

        let spec = match self.registry.resolve(&name) {
            Some(spec) => spec,
            None => {
                self.metrics.unknown_ignored += 1;
                return;
            }
        };

        info!(command = spec.name, actor = %event.actor, conversation = %event.conversation, "command received");

        if self.config.mode == BotMode::Private && !self.config.is_owner(&event.actor) {
            return;
        }

        let window = Duration::from_secs(self.config.command_cooldown_secs);
        if let Err(remaining) = self
            .cooldowns
            .check(&event.actor, ActionKind::Command, window)
        {
            self.metrics.record_cooldown_rejection();
            self.send(&event, &CommandError::CooldownActive(remaining).reply_text())
                .await;
            return;
        }

        if args.len() < spec.min_args {
            self.metrics.record_rejected();
            self.send(
                &event,
                &CommandError::Usage(spec.usage.to_string()).reply_text(),
            )
            .await;
            return;
        }

        if spec.group_only && !event.is_group() {
            self.metrics.record_rejected();
            self.send(&event, "❌ This command only works in group chats.")
                .await;
            return;
        }

        match spec.access {
            Access::Any => {}
            Access::Owner => {
                if !self.config.is_owner(&event.actor) {
                    self.metrics.record_permission_rejection();
                    self.send(&event, &CommandError::Permission.reply_text()).await;
                    return;
                }
            }
            Access::Admin => {
                let is_owner = self.config.is_owner(&event.actor);
                if let Err(e) = self
                    .moderation
                    .require_admin(&event.conversation, &event.actor, is_owner)
                    .await
                {
                    self.metrics.record_permission_rejection();
                    self.send(&event, &e.reply_text()).await;
                    return;
                }
            }
        }

        match self.route(spec.command, &event, &args).await {
            Ok(Some(reply)) => {
                self.metrics.record_ok();
                self.send(&event, &reply).await;
            }
            Ok(None) => self.metrics.record_ok(),
            Err(e) => {
                if e.is_unexpected() {
                    warn!(command = spec.name, error = %e, "command failed");
                    self.metrics.record_failed();
                } else {
                    self.metrics.record_rejected();
                }
                self.send(&event, &e.reply_text()).await;
            }
        }
    }

    async fn route(&mut self, command: Command, event: &InboundEvent, args: &[&str]) -> CommandReply {
        match command {
            Command::Help => self.cmd_help(event),
            Command::Ping => Ok(Some(format!("🏓 Pong! — {}", self.config.bot_name))),
            Command::Balance => self.cmd_balance(event, args),
            Command::Daily => self.cmd_daily(event),
            Command::Profile => self.cmd_profile(event, args),
            Command::Gamble => self.cmd_gamble(event, args),
            Command::Deposit => self.cmd_deposit(event, args),
            Command::Withdraw => self.cmd_withdraw(event, args),
            Command::Donate => self.cmd_donate(event, args),
            Command::Leaderboard => self.cmd_leaderboard(event),
            Command::Lottery => self.cmd_lottery(event),
            Command::Dig => self.cmd_activity(event, ActivityKind::Dig),
            Command::Fish => self.cmd_activity(event, ActivityKind::Fish),
            Command::Beg => self.cmd_activity(event, ActivityKind::Beg),
            Command::Edit => self.cmd_edit(event, args),
            Command::Claim => self.cmd_claim(event),
            Command::Deck => self.cmd_deck(event),
            Command::Card => self.cmd_card(event, args),
            Command::Cards => self.cmd_cards(event, args),
            Command::SeriesInfo => self.cmd_series_info(args),
            Command::CardLeaderboard => self.cmd_card_leaderboard(),
            Command::TicTacToe => self
                .games
                .board_move(&event.conversation, &event.actor, args.first().copied())
                .map(Some),
            Command::Hangman => self
                .games
                .word_guess(&event.conversation, &event.actor, args.first().copied())
                .map(Some),
            Command::Trivia => self
                .games
                .start_trivia(&event.conversation, &event.actor)
                .map(Some),
            Command::EightBall => self.cmd_eight_ball(args),
            Command::CoinFlip => self.cmd_coin_flip(),
            Command::Dice => self.cmd_dice(args),
            Command::Kick => self.cmd_kick(event, args).await,
            Command::Promote => self.cmd_promote(event, args).await,
            Command::Demote => self.cmd_demote(event, args).await,
            Command::Mute => self.cmd_mute(event, args),
            Command::Unmute => self.cmd_unmute(event, args),
            Command::Warn => self.cmd_warn(event, args),
            Command::Warnings => self.cmd_warnings(event, args),
            Command::ClearWarns => self.cmd_clear_warns(event, args),
            Command::TagAll => self.cmd_tag_all(event, args).await,
            Command::Delete => self.cmd_delete(event).await,
            Command::Mode => self.cmd_mode(args),
            Command::Stats => self.cmd_stats(),
            Command::ResetSession => self.cmd_reset_session(event).await,
        }
    }

    async fn send(&self, event: &InboundEvent, body: &str) {
        if let Err(e) = self.transport.send_message(&event.conversation, body).await {
            warn!(conversation = %event.conversation, error = %e, "failed to send reply");
        }
    }

    // ========== General ==========

    fn cmd_help(&self, event: &InboundEvent) -> CommandReply {
        let is_owner = self.config.is_owner(&event.actor);
        let mut text = format!("📖 *{} commands*\n\n", self.config.bot_name);
        for spec in self.registry.specs() {
            if spec.access == Access::Owner && !is_owner {
                continue;
            }
            text.push_str(&format!(
                "{}{} — {}\n",
                self.config.prefix, spec.usage, spec.description
            ));
        }
        Ok(Some(text))
    }

    // ========== Economy ==========

    fn cmd_balance(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let target = args
            .first()
            .and_then(|a| ActorId::from_mention(a))
            .unwrap_or_else(|| event.actor.clone());
        let account = self.ledger.account(&target);
        Ok(Some(format!(
            "💰 *Balance*\n\n👤 @{}\n💵 Wallet: ${}\n🏦 Bank: ${}\n💎 Net worth: ${}",
            target,
            account.balance,
            account.bank,
            account.net_worth()
        )))
    }

    fn cmd_daily(&self, event: &InboundEvent) -> CommandReply {
        let outcome = self.ledger.claim_daily(&event.actor, Utc::now())?;
        Ok(Some(format!(
            "🎁 *Daily reward claimed!*\n\n💰 Base: ${}\n🔥 Streak bonus: ${}\n✨ Total: ${}\n\n📊 Balance: ${}\n🔄 Streak: {} days",
            outcome.base, outcome.bonus, outcome.total, outcome.balance, outcome.streak
        )))
    }

    fn cmd_profile(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let target = args
            .first()
            .and_then(|a| ActorId::from_mention(a))
            .unwrap_or_else(|| event.actor.clone());
        let account = self.ledger.account(&target);
        let rank = self.ledger.rank(&target);

        let mut text = format!(
            "👤 *Profile of @{}*\n\n💵 Wallet: ${}\n🏦 Bank: ${}\n💎 Net worth: ${}\n🔄 Daily streak: {}\n📈 Total earned: ${}\n🎰 Games played: {}\n⭐ Rank: #{}",
            target,
            account.balance,
            account.bank,
            account.net_worth(),
            account.daily_streak,
            account.total_earned,
            account.games_played,
            rank
        );
        if let Some(bio) = &account.profile.bio {
            text.push_str(&format!("\n📝 Bio: {}", bio));
        }
        if let Some(age) = account.profile.age {
            text.push_str(&format!("\n🎂 Age: {}", age));
        }
        if let Some(status) = &account.profile.status {
            text.push_str(&format!("\n💬 Status: {}", status));
        }
        Ok(Some(text))
    }

    fn cmd_gamble(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let stake = parse_amount(args[0])?;
        let outcome = self.ledger.gamble(&event.actor, stake)?;
        if outcome.won {
            Ok(Some(format!(
                "🎉 *You won!*\n\n💰 Stake: ${}\n🎰 Multiplier: {:.2}x\n✨ Payout: ${}\n💵 Balance: ${}",
                outcome.stake, outcome.multiplier, outcome.payout, outcome.balance
            )))
        } else {
            Ok(Some(format!(
                "💸 *You lost!*\n\n💰 Stake: ${}\n💵 Balance: ${}\n\n🍀 Better luck next time!",
                outcome.stake, outcome.balance
            )))
        }
    }

    fn cmd_deposit(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let amount = parse_amount(args[0])?;
        let (balance, bank) = self.ledger.deposit(&event.actor, amount)?;
        Ok(Some(format!(
            "🏦 *Deposit complete*\n\n💵 Wallet: ${}\n🏦 Bank: ${}",
            balance, bank
        )))
    }

    fn cmd_withdraw(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let amount = parse_amount(args[0])?;
        let (balance, bank) = self.ledger.withdraw(&event.actor, amount)?;
        Ok(Some(format!(
            "🏦 *Withdrawal complete*\n\n💵 Wallet: ${}\n🏦 Bank: ${}",
            balance, bank
        )))
    }

    fn cmd_donate(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let target = ActorId::from_mention(args[0])
            .ok_or_else(|| CommandError::Usage("donate [@user] [amount]".into()))?;
        let amount = match parse_amount(args[1])? {
            AmountArg::Exact(v) => v,
            AmountArg::All => self.ledger.account(&event.actor).balance,
        };
        let remaining = self.ledger.transfer(&event.actor, &target, amount)?;
        Ok(Some(format!(
            "💝 *Donation sent*\n\n👤 To: @{}\n💰 Amount: ${}\n💵 Your balance: ${}",
            target, amount, remaining
        )))
    }

    fn cmd_leaderboard(&self, event: &InboundEvent) -> CommandReply {
        let entries = self.ledger.leaderboard(10);
        if entries.is_empty() {
            return Ok(Some("🏆 No accounts yet — be the first!".into()));
        }
        let mut text = String::from("🏆 *Leaderboard*\n\n");
        for (i, entry) in entries.iter().enumerate() {
            let medal = match i {
                0 => "🥇".to_string(),
                1 => "🥈".to_string(),
                2 => "🥉".to_string(),
                n => format!("{}.", n + 1),
            };
            text.push_str(&format!("{} @{} — ${}\n", medal, entry.actor, entry.net_worth));
        }
        text.push_str(&format!("\n📊 Your rank: #{}", self.ledger.rank(&event.actor)));
        Ok(Some(text))
    }

    fn cmd_lottery(&self, event: &InboundEvent) -> CommandReply {
        let outcome = self.ledger.lottery(&event.actor)?;
        Ok(Some(format!(
            "🎫 *Lottery*\n\n{}\n\n💰 Prize: ${}\n💵 Balance: ${}",
            outcome.note, outcome.prize, outcome.balance
        )))
    }

    fn cmd_activity(&self, event: &InboundEvent, kind: ActivityKind) -> CommandReply {
        let outcome = match self.ledger.activity(&event.actor, kind, Utc::now()) {
            Ok(outcome) => outcome,
            Err(CommandError::CooldownActive(remaining)) => {
                return Ok(Some(format!(
                    "⏰ You're worn out from {}! Rest for {}.",
                    kind.label(),
                    format_remaining(remaining)
                )));
            }
            Err(e) => return Err(e),
        };
        Ok(Some(format!(
            "{}\n\n💰 Earned: ${}\n💵 Balance: ${}",
            outcome.note, outcome.reward, outcome.balance
        )))
    }

    fn cmd_edit(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let field = ProfileField::parse(args[0])
            .ok_or_else(|| CommandError::Usage("edit [bio|age|status] [value]".into()))?;
        let value = args[1..].join(" ");
        let stored = self.ledger.edit_profile(&event.actor, field, &value)?;
        Ok(Some(format!(
            "✏️ *Profile updated*\n\n📝 {}: {}",
            args[0].to_ascii_lowercase(),
            stored
        )))
    }

    // ========== Cards ==========

    fn cmd_claim(&self, event: &InboundEvent) -> CommandReply {
        let outcome = self.cards.claim(&event.actor, Utc::now())?;
        let card = outcome.card;
        Ok(Some(format!(
            "🎉 *Card claimed!*\n\n🃏 {}\n⭐ Tier: {}\n💎 Rarity: {}\n⚡ Power: {}\n💰 Value: ${}\n\n🎴 Total cards: {}",
            card.name,
            card.tier.label(),
            card.tier.rarity(),
            card.power,
            card.value,
            outcome.total_cards
        )))
    }

    fn cmd_deck(&self, event: &InboundEvent) -> CommandReply {
        let collection = self.cards.collection(&event.actor);
        if collection.cards.is_empty() {
            return Ok(Some(
                "🃏 Your deck is empty! Use the claim command to get your first card.".into(),
            ));
        }
        let mut text = format!(
            "🃏 *Your deck*\n\n🎴 Cards: {}\n💰 Deck value: ${}\n\n",
            collection.cards.len(),
            collection.deck_value()
        );
        for (i, card) in collection.cards.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} ({}) — ${}\n",
                i + 1,
                card.name,
                card.tier.label(),
                card.value()
            ));
        }
        Ok(Some(text))
    }

    fn cmd_card(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let index: usize = args[0]
            .parse()
            .map_err(|_| CommandError::Usage("card [index]".into()))?;
        let card = self
            .cards
            .card_at(&event.actor, index)
            .ok_or_else(|| CommandError::Usage("card [index] — check your deck first".into()))?;
        let detail = cards::find_card(&card.name, card.tier);
        let power = detail.map(|c| c.power).unwrap_or(0);
        Ok(Some(format!(
            "🃏 *Card #{}*\n\n📛 {}\n🏷️ Series: {}\n⭐ Tier: {}\n💎 Rarity: {}\n⚡ Power: {}\n💰 Value: ${}\n📅 Obtained: {}",
            index,
            card.name,
            card.series,
            card.tier.label(),
            card.tier.rarity(),
            power,
            card.value(),
            card.obtained_at.format("%Y-%m-%d")
        )))
    }

    fn cmd_cards(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let enabled = match args[0].to_ascii_lowercase().as_str() {
            "on" => true,
            "off" => false,
            _ => return Err(CommandError::Usage("cards [on|off]".into())),
        };
        self.cards.set_enabled(&event.actor, enabled)?;
        Ok(Some(if enabled {
            "🃏 Cards enabled — collect away!".into()
        } else {
            "🃏 Cards disabled for you.".into()
        }))
    }

    fn cmd_series_info(&self, args: &[&str]) -> CommandReply {
        let name = args.join(" ");
        let cards_in = cards::cards_in_series(&name);
        if cards_in.is_empty() {
            return Err(CommandError::Usage(format!(
                "si [series] — available: {}",
                cards::series_names().join(", ")
            )));
        }
        let mut text = format!("🏷️ *{} series*\n\n", cards_in[0].series);
        for card in cards_in {
            text.push_str(&format!(
                "• {} ({}) — {} — ${}\n",
                card.name,
                card.tier.label(),
                card.tier.rarity(),
                card.value
            ));
        }
        Ok(Some(text))
    }

    fn cmd_card_leaderboard(&self) -> CommandReply {
        let entries = self.cards.leaderboard(10);
        if entries.is_empty() {
            return Ok(Some(
                "🏆 No collectors yet! Use the claim command to start.".into(),
            ));
        }
        let mut text = String::from("🏆 *Card collectors*\n\n");
        for (i, entry) in entries.iter().enumerate() {
            text.push_str(&format!(
                "{}. @{} — {} cards, ${}\n",
                i + 1,
                entry.actor,
                entry.card_count,
                entry.deck_value
            ));
        }
        Ok(Some(text))
    }

    // ========== Stateless fun ==========

    fn cmd_eight_ball(&self, args: &[&str]) -> CommandReply {
        const RESPONSES: [&str; 20] = [
            "It is certain",
            "It is decidedly so",
            "Without a doubt",
            "Yes definitely",
            "You may rely on it",
            "As I see it, yes",
            "Most likely",
            "Outlook good",
            "Yes",
            "Signs point to yes",
            "Reply hazy, try again",
            "Ask again later",
            "Better not tell you now",
            "Cannot predict now",
            "Concentrate and ask again",
            "Don't count on it",
            "My reply is no",
            "My sources say no",
            "Outlook not so good",
            "Very doubtful",
        ];
        let answer = RESPONSES[rand::thread_rng().gen_range(0..RESPONSES.len())];
        Ok(Some(format!(
            "🎱 *Magic 8-ball*\n\n❓ {}\n🔮 *{}*",
            args.join(" "),
            answer
        )))
    }

    fn cmd_coin_flip(&self) -> CommandReply {
        let (face, emoji) = if rand::thread_rng().gen_bool(0.5) {
            ("HEADS", "👑")
        } else {
            ("TAILS", "🔸")
        };
        Ok(Some(format!("🪙 *Coin flip*\n\n{} *{}* {}", emoji, face, emoji)))
    }

    fn cmd_dice(&self, args: &[&str]) -> CommandReply {
        let count: usize = match args.first() {
            Some(arg) => arg
                .parse()
                .ok()
                .filter(|c| (1..=6).contains(c))
                .ok_or_else(|| CommandError::Usage("dice [count] — up to 6 dice".into()))?,
            None => 1,
        };
        const FACES: [&str; 6] = ["⚀", "⚁", "⚂", "⚃", "⚄", "⚅"];
        let mut rng = rand::thread_rng();
        let rolls: Vec<usize> = (0..count).map(|_| rng.gen_range(1..=6)).collect();
        let faces: Vec<&str> = rolls.iter().map(|&r| FACES[r - 1]).collect();
        let total: usize = rolls.iter().sum();
        Ok(Some(format!(
            "🎲 *Dice roll*\n\n{}\n\n🔢 Total: {}",
            faces.join(" "),
            total
        )))
    }

    // ========== Moderation ==========

    async fn cmd_kick(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args)
            .ok_or_else(|| CommandError::Usage("kick [@user] — or reply to their message".into()))?;
        self.moderation.kick(&event.conversation, &target).await?;
        Ok(Some(format!("✅ @{} has been removed from the group.", target)))
    }

    async fn cmd_promote(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("promote [@user] — or reply to their message".into())
        })?;
        self.moderation.promote(&event.conversation, &target).await?;
        Ok(Some(format!("✅ @{} has been promoted to admin.", target)))
    }

    async fn cmd_demote(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("demote [@user] — or reply to their message".into())
        })?;
        self.moderation.demote(&event.conversation, &target).await?;
        Ok(Some(format!("✅ @{} has been demoted.", target)))
    }

    fn cmd_mute(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("mute [minutes] [@user] — or reply to their message".into())
        })?;
        let minutes = args
            .iter()
            .find_map(|a| a.parse::<i64>().ok())
            .filter(|m| (1..=7 * 24 * 60).contains(m))
            .unwrap_or(self.config.moderation.default_mute_minutes);
        let duration = Duration::from_secs(minutes as u64 * 60);
        self.moderation
            .mute(&event.conversation, &target, duration, Utc::now())?;
        Ok(Some(format!(
            "🔇 @{} has been muted for {} minutes.",
            target, minutes
        )))
    }

    fn cmd_unmute(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("unmute [@user] — or reply to their message".into())
        })?;
        self.moderation
            .unmute(&event.conversation, &target, Utc::now())?;
        Ok(Some(format!("🔊 @{} has been unmuted.", target)))
    }

    fn cmd_warn(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, consumed) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("warn [@user] [reason] — or reply to their message".into())
        })?;
        let reason = {
            let rest = args[consumed.min(args.len())..].join(" ");
            if rest.is_empty() {
                "No reason provided".to_string()
            } else {
                rest
            }
        };

        let outcome = self
            .moderation
            .warn(&event.conversation, &target, reason.clone(), &event.actor, Utc::now());

        let mut text = format!(
            "⚠️ *Warning issued*\n\n👤 @{}\n📝 Reason: {}\n📊 Warnings: {}/{}",
            target, reason, outcome.count, outcome.limit
        );
        if outcome.escalated {
            text.push_str("\n\n🚫 Warning limit reached — removal incoming.");
        }
        Ok(Some(text))
    }

    fn cmd_warnings(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("warnings [@user] — or reply to their message".into())
        })?;
        let warnings = self.moderation.warnings(&event.conversation, &target);
        if warnings.is_empty() {
            return Ok(Some(format!("✅ @{} has no warnings.", target)));
        }
        let mut text = format!(
            "⚠️ *Warnings for @{}* ({}/{})\n\n",
            target,
            warnings.len(),
            self.config.moderation.warn_limit
        );
        for (i, warning) in warnings.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} — by @{} on {}\n",
                i + 1,
                warning.reason,
                warning.issued_by,
                warning.issued_at.format("%Y-%m-%d")
            ));
        }
        Ok(Some(text))
    }

    fn cmd_clear_warns(&self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        let (target, _) = resolve_target(event, args).ok_or_else(|| {
            CommandError::Usage("clearwarns [@user] — or reply to their message".into())
        })?;
        let cleared = self.moderation.clear_warnings(&event.conversation, &target);
        Ok(Some(format!(
            "🧹 Cleared {} warning(s) for @{}.",
            cleared, target
        )))
    }

    async fn cmd_tag_all(&mut self, event: &InboundEvent, args: &[&str]) -> CommandReply {
        if let Err(remaining) =
            self.cooldowns
                .check(&event.actor, ActionKind::Tagall, TAGALL_COOLDOWN)
        {
            return Err(CommandError::CooldownActive(remaining));
        }
        let participants = self.transport.participants(&event.conversation).await?;
        let message = if args.is_empty() {
            "Everyone, attention please!".to_string()
        } else {
            args.join(" ")
        };
        let mentions: Vec<String> = participants
            .iter()
            .map(|p| format!("@{}", p.actor))
            .collect();
        Ok(Some(format!(
            "📢 *Announcement*\n\n{}\n\n{}",
            message,
            mentions.join(" ")
        )))
    }

    async fn cmd_delete(&self, event: &InboundEvent) -> CommandReply {
        let quoted = event
            .quoted
            .as_ref()
            .ok_or_else(|| CommandError::Usage("reply to a message with del".into()))?;
        self.transport
            .delete_message(&event.conversation, &quoted.message_id)
            .await?;

        // Confirmation removes itself shortly after
        let confirmation_id = self
            .transport
            .send_message(&event.conversation, "🗑️ Message deleted by admin.")
            .await?;
        let transport = self.transport.clone();
        let conversation = event.conversation.clone();
        scheduler::schedule(CONFIRMATION_TTL, async move {
            if let Err(e) = transport.delete_message(&conversation, &confirmation_id).await {
                info!(error = %e, "failed to remove delete-confirmation");
            }
        });
        Ok(None)
    }

    // ========== Owner ==========

    fn cmd_mode(&mut self, args: &[&str]) -> CommandReply {
        let mode = match args[0].to_ascii_lowercase().as_str() {
            "public" => BotMode::Public,
            "private" => BotMode::Private,
            _ => return Err(CommandError::Usage("mode [public|private]".into())),
        };
        self.config.mode = mode;
        Ok(Some(match mode {
            BotMode::Public => "⚙️ Mode: PUBLIC — everyone may use commands.".into(),
            BotMode::Private => "⚙️ Mode: PRIVATE — owner only.".into(),
        }))
    }

    fn cmd_stats(&self) -> CommandReply {
        let now = Utc::now();
        let (muted, warned) = self.moderation.counts(now);
        let (boards, words, trivia) = self.games.session_counts();
        let report = serde_json::json!({
            "metrics": self.metrics,
            "accounts": self.ledger.account_count(),
            "sessions": { "board": boards, "word": words, "trivia": trivia },
            "moderation": { "muted": muted, "warned": warned },
            "active_cooldowns": self.cooldowns.active_count(),
        });
        let body = serde_json::to_string_pretty(&report)
            .map_err(|e| CommandError::Internal(e.to_string()))?;
        Ok(Some(format!("📊 *Stats*\n\n{}", body)))
    }

    /// Deliberate process exit: the supervisor is expected to restart us
    /// with a fresh transport session.
    async fn cmd_reset_session(&self, event: &InboundEvent) -> CommandReply {
        warn!(actor = %event.actor, "reset session requested, exiting for supervised restart");
        self.send(event, "🔄 Resetting session — restarting now.").await;
        std::process::exit(0);
    }
}
