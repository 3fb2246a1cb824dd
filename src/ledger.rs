//! Economy ledger: per-actor accounts with read-modify-write mutations.
//!
//! Every mutating call runs the same cycle under one lock: read the current
//! record, apply a pure change, persist the full collection. Timers and live
//! commands therefore serialize on the account map instead of racing on the
//! file. Accounts are created lazily on first reference and never deleted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EconomyConfig;
use crate::error::CommandError;
use crate::store::PersistentStore;
use crate::transport::ActorId;

pub const USERS_COLLECTION: &str = "users";

/// Cost of one lottery ticket
const LOTTERY_TICKET_PRICE: i64 = 100;

/// Cooldown-gated reward activities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Dig,
    Fish,
    Beg,
}

impl ActivityKind {
    pub fn cooldown(self) -> Duration {
        match self {
            ActivityKind::Dig => Duration::from_secs(60 * 60),
            ActivityKind::Fish => Duration::from_secs(45 * 60),
            ActivityKind::Beg => Duration::from_secs(30 * 60),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityKind::Dig => "digging",
            ActivityKind::Fish => "fishing",
            ActivityKind::Beg => "begging",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One actor's economy record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub balance: i64,
    #[serde(default)]
    pub bank: i64,
    #[serde(default)]
    pub daily_streak: u32,
    #[serde(default)]
    pub total_earned: i64,
    #[serde(default)]
    pub games_played: u64,
    #[serde(default)]
    pub last_daily: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity: HashMap<ActivityKind, DateTime<Utc>>,
    #[serde(default)]
    pub profile: Profile,
}

impl Account {
    fn fresh(starting_balance: i64) -> Self {
        Self {
            balance: starting_balance,
            bank: 0,
            daily_streak: 0,
            total_earned: starting_balance,
            games_played: 0,
            last_daily: None,
            last_activity: HashMap::new(),
            profile: Profile::default(),
        }
    }

    pub fn net_worth(&self) -> i64 {
        self.balance + self.bank
    }
}

/// Amount argument as users type it: a number or "all"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountArg {
    All,
    Exact(i64),
}

#[derive(Debug, Clone)]
pub struct DailyOutcome {
    pub base: i64,
    pub bonus: i64,
    pub total: i64,
    pub balance: i64,
    pub streak: u32,
}

#[derive(Debug, Clone)]
pub struct GambleOutcome {
    pub won: bool,
    pub stake: i64,
    pub multiplier: f64,
    pub payout: i64,
    pub balance: i64,
}

#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub kind: ActivityKind,
    pub note: &'static str,
    pub reward: i64,
    pub balance: i64,
}

#[derive(Debug, Clone)]
pub struct LotteryOutcome {
    pub note: &'static str,
    pub prize: i64,
    pub balance: i64,
}

#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub actor: String,
    pub net_worth: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Bio,
    Age,
    Status,
}

impl ProfileField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bio" => Some(ProfileField::Bio),
            "age" => Some(ProfileField::Age),
            "status" => Some(ProfileField::Status),
            _ => None,
        }
    }
}

pub struct Ledger {
    store: PersistentStore,
    config: EconomyConfig,
    accounts: Mutex<HashMap<String, Account>>,
}

impl Ledger {
    pub fn new(store: PersistentStore, config: EconomyConfig) -> Self {
        let accounts = store.load(USERS_COLLECTION);
        Self {
            store,
            config,
            accounts: Mutex::new(accounts),
        }
    }

    /// Read-modify-write cycle: locks the map, lazily creates the account,
    /// applies `apply`, persists the whole collection.
    fn mutate<R>(
        &self,
        actor: &ActorId,
        apply: impl FnOnce(&mut Account) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .entry(actor.as_str().to_string())
            .or_insert_with(|| Account::fresh(self.config.starting_balance));
        let result = apply(account)?;
        self.store.save(USERS_COLLECTION, &accounts);
        Ok(result)
    }

    /// Snapshot of an actor's account, creating it on first reference.
    pub fn account(&self, actor: &ActorId) -> Account {
        let mut accounts = self.accounts.lock().unwrap();
        let created = !accounts.contains_key(actor.as_str());
        let account = accounts
            .entry(actor.as_str().to_string())
            .or_insert_with(|| Account::fresh(self.config.starting_balance))
            .clone();
        if created {
            self.store.save(USERS_COLLECTION, &accounts);
        }
        account
    }

    pub fn credit(&self, actor: &ActorId, amount: i64) -> Result<i64, CommandError> {
        self.mutate(actor, |account| {
            account.balance += amount;
            account.total_earned += amount.max(0);
            Ok(account.balance)
        })
    }

    pub fn debit(&self, actor: &ActorId, amount: i64) -> Result<i64, CommandError> {
        self.mutate(actor, |account| {
            if amount > account.balance {
                return Err(CommandError::InsufficientFunds {
                    have: account.balance,
                    need: amount,
                });
            }
            account.balance -= amount;
            Ok(account.balance)
        })
    }

    /// Move funds between two actors. On failure neither account changes.
    pub fn transfer(
        &self,
        from: &ActorId,
        to: &ActorId,
        amount: i64,
    ) -> Result<i64, CommandError> {
        if from == to {
            return Err(CommandError::SelfTransfer);
        }
        if amount <= 0 {
            return Err(CommandError::InvalidStake);
        }

        let mut accounts = self.accounts.lock().unwrap();
        let from_balance = accounts
            .get(from.as_str())
            .map(|a| a.balance)
            .unwrap_or(self.config.starting_balance);
        if amount > from_balance {
            return Err(CommandError::InsufficientFunds {
                have: from_balance,
                need: amount,
            });
        }

        let starting = self.config.starting_balance;
        let sender = accounts
            .entry(from.as_str().to_string())
            .or_insert_with(|| Account::fresh(starting));
        sender.balance -= amount;
        let remaining = sender.balance;

        let receiver = accounts
            .entry(to.as_str().to_string())
            .or_insert_with(|| Account::fresh(starting));
        receiver.balance += amount;
        receiver.total_earned += amount;

        self.store.save(USERS_COLLECTION, &accounts);
        info!(from = %from, to = %to, amount, "transfer completed");
        Ok(remaining)
    }

    /// Claim the daily reward. At most once per calendar day.
    pub fn claim_daily(
        &self,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<DailyOutcome, CommandError> {
        let (min, max) = (self.config.daily_base_min, self.config.daily_base_max);
        self.mutate(actor, |account| {
            if let Some(last) = account.last_daily {
                if last.date_naive() == now.date_naive() {
                    return Err(CommandError::CooldownActive(until_next_day(now)));
                }
            }

            let base = rand::thread_rng().gen_range(min..=max);
            let bonus = 10 * i64::from(account.daily_streak);
            let total = base + bonus;

            account.balance += total;
            account.total_earned += total;
            account.daily_streak += 1;
            account.last_daily = Some(now);

            Ok(DailyOutcome {
                base,
                bonus,
                total,
                balance: account.balance,
                streak: account.daily_streak,
            })
        })
    }

    /// Gamble a stake: fixed win probability, multiplier uniform in [0.5, 2.0].
    /// Balance and `games_played` update in a single ledger write.
    pub fn gamble(&self, actor: &ActorId, stake: AmountArg) -> Result<GambleOutcome, CommandError> {
        let win_chance = self.config.gamble_win_chance;
        self.mutate(actor, |account| {
            let stake = match stake {
                AmountArg::All => account.balance,
                AmountArg::Exact(v) => v,
            };
            if stake <= 0 {
                return Err(CommandError::InvalidStake);
            }
            if stake > account.balance {
                return Err(CommandError::InsufficientFunds {
                    have: account.balance,
                    need: stake,
                });
            }

            let mut rng = rand::thread_rng();
            account.games_played += 1;

            if rng.gen_bool(win_chance) {
                let multiplier = rng.gen_range(0.5..2.0);
                let payout = (stake as f64 * multiplier).floor() as i64;
                account.balance += payout;
                account.total_earned += payout;
                Ok(GambleOutcome {
                    won: true,
                    stake,
                    multiplier,
                    payout,
                    balance: account.balance,
                })
            } else {
                account.balance -= stake;
                Ok(GambleOutcome {
                    won: false,
                    stake,
                    multiplier: 0.0,
                    payout: 0,
                    balance: account.balance,
                })
            }
        })
    }

    /// Move funds from balance into the bank. Returns (balance, bank).
    pub fn deposit(&self, actor: &ActorId, amount: AmountArg) -> Result<(i64, i64), CommandError> {
        self.mutate(actor, |account| {
            let amount = match amount {
                AmountArg::All => account.balance,
                AmountArg::Exact(v) => v,
            };
            if amount <= 0 {
                return Err(CommandError::InvalidStake);
            }
            if amount > account.balance {
                return Err(CommandError::InsufficientFunds {
                    have: account.balance,
                    need: amount,
                });
            }
            account.balance -= amount;
            account.bank += amount;
            Ok((account.balance, account.bank))
        })
    }

    /// Move funds from the bank back to balance. Returns (balance, bank).
    pub fn withdraw(&self, actor: &ActorId, amount: AmountArg) -> Result<(i64, i64), CommandError> {
        self.mutate(actor, |account| {
            let amount = match amount {
                AmountArg::All => account.bank,
                AmountArg::Exact(v) => v,
            };
            if amount <= 0 {
                return Err(CommandError::InvalidStake);
            }
            if amount > account.bank {
                return Err(CommandError::InsufficientFunds {
                    have: account.bank,
                    need: amount,
                });
            }
            account.bank -= amount;
            account.balance += amount;
            Ok((account.balance, account.bank))
        })
    }

    /// Run a cooldown-gated reward activity (dig/fish/beg).
    pub fn activity(
        &self,
        actor: &ActorId,
        kind: ActivityKind,
        now: DateTime<Utc>,
    ) -> Result<ActivityOutcome, CommandError> {
        self.mutate(actor, |account| {
            if let Some(last) = account.last_activity.get(&kind) {
                let elapsed = (now - *last).to_std().unwrap_or_default();
                let window = kind.cooldown();
                if elapsed < window {
                    return Err(CommandError::CooldownActive(window - elapsed));
                }
            }

            let (note, reward) = roll_activity(kind);
            account.last_activity.insert(kind, now);
            account.balance += reward;
            account.total_earned += reward;

            Ok(ActivityOutcome {
                kind,
                note,
                reward,
                balance: account.balance,
            })
        })
    }

    /// Buy one lottery ticket and roll the prize table.
    pub fn lottery(&self, actor: &ActorId) -> Result<LotteryOutcome, CommandError> {
        self.mutate(actor, |account| {
            if account.balance < LOTTERY_TICKET_PRICE {
                return Err(CommandError::InsufficientFunds {
                    have: account.balance,
                    need: LOTTERY_TICKET_PRICE,
                });
            }
            account.balance -= LOTTERY_TICKET_PRICE;

            let roll: f64 = rand::thread_rng().gen();
            let (note, prize) = if roll < 0.01 {
                ("🎊 MEGA JACKPOT! 🎊", 10_000)
            } else if roll < 0.05 {
                ("🎉 Big win!", 5_000)
            } else if roll < 0.15 {
                ("🎯 Good win!", 1_000)
            } else if roll < 0.30 {
                ("✨ Small win!", 500)
            } else if roll < 0.50 {
                ("🍀 Lucky!", 200)
            } else {
                ("😢 Better luck next time!", 0)
            };

            account.balance += prize;
            account.total_earned += prize;
            Ok(LotteryOutcome {
                note,
                prize,
                balance: account.balance,
            })
        })
    }

    pub fn edit_profile(
        &self,
        actor: &ActorId,
        field: ProfileField,
        value: &str,
    ) -> Result<String, CommandError> {
        self.mutate(actor, |account| match field {
            ProfileField::Bio => {
                if value.len() > 150 {
                    return Err(CommandError::Usage(
                        "bio text too long (150 characters max)".into(),
                    ));
                }
                account.profile.bio = Some(value.to_string());
                Ok(value.to_string())
            }
            ProfileField::Status => {
                if value.len() > 100 {
                    return Err(CommandError::Usage(
                        "status text too long (100 characters max)".into(),
                    ));
                }
                account.profile.status = Some(value.to_string());
                Ok(value.to_string())
            }
            ProfileField::Age => {
                let age: u8 = value
                    .parse()
                    .ok()
                    .filter(|a| (13..=100).contains(a))
                    .ok_or_else(|| {
                        CommandError::Usage("age must be a number between 13 and 100".into())
                    })?;
                account.profile.age = Some(age);
                Ok(age.to_string())
            }
        })
    }

    /// Top accounts by net worth, richest first.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let accounts = self.accounts.lock().unwrap();
        let mut entries: Vec<LeaderboardEntry> = accounts
            .iter()
            .map(|(actor, account)| LeaderboardEntry {
                actor: actor.clone(),
                net_worth: account.net_worth(),
            })
            .collect();
        entries.sort_by(|a, b| b.net_worth.cmp(&a.net_worth).then(a.actor.cmp(&b.actor)));
        entries.truncate(limit);
        entries
    }

    /// 1-based rank of an actor by net worth.
    pub fn rank(&self, actor: &ActorId) -> usize {
        let accounts = self.accounts.lock().unwrap();
        let own = accounts
            .get(actor.as_str())
            .map(|a| a.net_worth())
            .unwrap_or(self.config.starting_balance);
        let higher = accounts.values().filter(|a| a.net_worth() > own).count();
        higher + 1
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

/// Time left until the next UTC calendar day starts.
fn until_next_day(now: DateTime<Utc>) -> Duration {
    match now
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        Some(midnight) => (midnight.and_utc() - now).to_std().unwrap_or_default(),
        None => Duration::ZERO,
    }
}

fn roll_activity(kind: ActivityKind) -> (&'static str, i64) {
    let roll: f64 = rand::thread_rng().gen();
    match kind {
        ActivityKind::Dig => {
            if roll < 0.05 {
                ("💎 You struck a rare diamond!", 1000)
            } else if roll < 0.15 {
                ("🪙 You unearthed a pouch of gold coins!", 500)
            } else if roll < 0.30 {
                ("⚡ You found a vein of valuable ore!", 200)
            } else if roll < 0.50 {
                ("🔩 You dug up some scrap metal!", 100)
            } else if roll < 0.70 {
                ("🪨 You found a few odd stones!", 50)
            } else {
                ("🕳️ Nothing but dirt and rocks down there...", 0)
            }
        }
        ActivityKind::Fish => {
            if roll < 0.05 {
                ("🐡 A rare fish! The catch of a lifetime!", 800)
            } else if roll < 0.15 {
                ("🦈 You wrestled in a shark!", 500)
            } else if roll < 0.30 {
                ("🐙 An octopus latched onto your line!", 300)
            } else if roll < 0.50 {
                ("🦑 You hauled up a squid!", 200)
            } else if roll < 0.75 {
                ("🐠 A shiny tropical fish!", 100)
            } else {
                ("🐟 A common fish. Dinner is dinner.", 50)
            }
        }
        ActivityKind::Beg => {
            const RESPONSES: [(&str, i64); 6] = [
                ("A kind stranger tossed you some coins!", 50),
                ("Someone felt sorry for you.", 30),
                ("A generous passer-by helped you out!", 80),
                ("You found money someone dropped!", 40),
                ("Someone threw coins your way!", 60),
                ("Everyone ignored you completely...", 0),
            ];
            RESPONSES[rand::thread_rng().gen_range(0..RESPONSES.len())]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn ledger(dir: &std::path::Path) -> Ledger {
        Ledger::new(PersistentStore::new(dir), EconomyConfig::default())
    }

    fn actor(id: &str) -> ActorId {
        ActorId(id.to_string())
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_lazy_account_creation() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());

        let account = ledger.account(&actor("u1"));
        assert_eq!(account.balance, 1000);
        assert_eq!(account.daily_streak, 0);
        assert_eq!(ledger.account_count(), 1);
    }

    #[test]
    fn test_credit_and_debit() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        assert_eq!(ledger.credit(&u, 500).unwrap(), 1500);
        assert_eq!(ledger.debit(&u, 200).unwrap(), 1300);
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        let err = ledger.debit(&u, 5000).unwrap_err();
        assert!(matches!(err, CommandError::InsufficientFunds { have: 1000, .. }));
        assert_eq!(ledger.account(&u).balance, 1000);
    }

    #[test]
    fn test_transfer_rejects_self() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());

        let err = ledger.transfer(&actor("a"), &actor("a"), 100).unwrap_err();
        assert!(matches!(err, CommandError::SelfTransfer));
    }

    #[test]
    fn test_transfer_insufficient_mutates_neither() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let (a, b) = (actor("a"), actor("b"));
        ledger.account(&a);
        ledger.account(&b);

        let err = ledger.transfer(&a, &b, 1001).unwrap_err();
        assert!(matches!(err, CommandError::InsufficientFunds { .. }));
        assert_eq!(ledger.account(&a).balance, 1000);
        assert_eq!(ledger.account(&b).balance, 1000);
    }

    #[test]
    fn test_transfer_moves_funds() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let (a, b) = (actor("a"), actor("b"));

        let remaining = ledger.transfer(&a, &b, 400).unwrap();
        assert_eq!(remaining, 600);
        assert_eq!(ledger.account(&b).balance, 1400);
    }

    #[test]
    fn test_daily_claim_once_per_calendar_day() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        let morning = at(2025, 3, 10, 8);
        let evening = at(2025, 3, 10, 22);
        let outcome = ledger.claim_daily(&u, morning).unwrap();
        assert!(outcome.base >= 100 && outcome.base <= 599);
        assert_eq!(outcome.bonus, 0);
        assert_eq!(outcome.streak, 1);

        let balance_after = ledger.account(&u).balance;
        let err = ledger.claim_daily(&u, evening).unwrap_err();
        assert!(matches!(err, CommandError::CooldownActive(_)));
        // Failed claim leaves balance and streak untouched
        assert_eq!(ledger.account(&u).balance, balance_after);
        assert_eq!(ledger.account(&u).daily_streak, 1);
    }

    #[test]
    fn test_daily_streak_bonus() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        ledger.claim_daily(&u, at(2025, 3, 10, 8)).unwrap();
        let second = ledger.claim_daily(&u, at(2025, 3, 11, 8)).unwrap();
        assert_eq!(second.bonus, 10);
        assert_eq!(second.streak, 2);

        let third = ledger.claim_daily(&u, at(2025, 3, 12, 8)).unwrap();
        assert_eq!(third.bonus, 20);
        assert_eq!(third.streak, 3);
    }

    #[test]
    fn test_gamble_conservation() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        for _ in 0..50 {
            let before = ledger.account(&u);
            let stake = (before.balance / 4).max(1);
            let outcome = ledger.gamble(&u, AmountArg::Exact(stake)).unwrap();
            let after = ledger.account(&u);

            if outcome.won {
                assert_eq!(after.balance, before.balance + outcome.payout);
                assert!(outcome.payout >= stake / 2);
            } else {
                assert_eq!(after.balance, before.balance - stake);
            }
            assert!(after.balance >= 0);
            assert_eq!(after.games_played, before.games_played + 1);
        }
    }

    #[test]
    fn test_gamble_invalid_stakes() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        assert!(matches!(
            ledger.gamble(&u, AmountArg::Exact(0)).unwrap_err(),
            CommandError::InvalidStake
        ));
        assert!(matches!(
            ledger.gamble(&u, AmountArg::Exact(-5)).unwrap_err(),
            CommandError::InvalidStake
        ));
        assert!(matches!(
            ledger.gamble(&u, AmountArg::Exact(9999)).unwrap_err(),
            CommandError::InsufficientFunds { .. }
        ));
        // No game counted for rejected stakes
        assert_eq!(ledger.account(&u).games_played, 0);
    }

    #[test]
    fn test_bank_deposit_withdraw() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        let (balance, bank) = ledger.deposit(&u, AmountArg::Exact(600)).unwrap();
        assert_eq!((balance, bank), (400, 600));

        let (balance, bank) = ledger.withdraw(&u, AmountArg::Exact(100)).unwrap();
        assert_eq!((balance, bank), (500, 500));

        let (balance, bank) = ledger.deposit(&u, AmountArg::All).unwrap();
        assert_eq!((balance, bank), (0, 1000));

        assert!(matches!(
            ledger.withdraw(&u, AmountArg::Exact(1001)).unwrap_err(),
            CommandError::InsufficientFunds { .. }
        ));
    }

    #[test]
    fn test_activity_cooldown() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        let start = at(2025, 3, 10, 8);
        ledger.activity(&u, ActivityKind::Dig, start).unwrap();

        let soon = start + chrono::Duration::minutes(10);
        let err = ledger.activity(&u, ActivityKind::Dig, soon).unwrap_err();
        match err {
            CommandError::CooldownActive(remaining) => {
                assert!(remaining <= Duration::from_secs(50 * 60));
            }
            other => panic!("expected CooldownActive, got {:?}", other),
        }

        // Fishing has its own gate
        assert!(ledger.activity(&u, ActivityKind::Fish, soon).is_ok());

        let later = start + chrono::Duration::hours(2);
        assert!(ledger.activity(&u, ActivityKind::Dig, later).is_ok());
    }

    #[test]
    fn test_lottery_ticket_price_always_paid() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        let before = ledger.account(&u).balance;
        let outcome = ledger.lottery(&u).unwrap();
        assert_eq!(outcome.balance, before - 100 + outcome.prize);
    }

    #[test]
    fn test_profile_edit_validation() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());
        let u = actor("u1");

        ledger.edit_profile(&u, ProfileField::Bio, "hello there").unwrap();
        ledger.edit_profile(&u, ProfileField::Age, "25").unwrap();
        let account = ledger.account(&u);
        assert_eq!(account.profile.bio.as_deref(), Some("hello there"));
        assert_eq!(account.profile.age, Some(25));

        assert!(ledger.edit_profile(&u, ProfileField::Age, "200").is_err());
        assert!(ledger.edit_profile(&u, ProfileField::Age, "old").is_err());
        let long = "x".repeat(151);
        assert!(ledger.edit_profile(&u, ProfileField::Bio, &long).is_err());
    }

    #[test]
    fn test_leaderboard_and_rank() {
        let dir = tempdir().unwrap();
        let ledger = ledger(dir.path());

        ledger.credit(&actor("rich"), 5000).unwrap();
        ledger.credit(&actor("mid"), 100).unwrap();
        ledger.account(&actor("poor"));

        let board = ledger.leaderboard(2);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].actor, "rich");
        assert_eq!(board[1].actor, "mid");

        assert_eq!(ledger.rank(&actor("rich")), 1);
        assert_eq!(ledger.rank(&actor("poor")), 3);
    }

    #[test]
    fn test_persists_across_restart() {
        let dir = tempdir().unwrap();
        let u = actor("u1");
        {
            let ledger = ledger(dir.path());
            ledger.credit(&u, 2345).unwrap();
            ledger.deposit(&u, AmountArg::Exact(45)).unwrap();
        }

        let reopened = Ledger::new(PersistentStore::new(dir.path()), EconomyConfig::default());
        let account = reopened.account(&u);
        assert_eq!(account.balance, 3300);
        assert_eq!(account.bank, 45);
    }

    #[test]
    fn test_absent_fields_default_on_load() {
        let dir = tempdir().unwrap();
        // A record written by an older build without the newer fields
        std::fs::write(
            dir.path().join("users.json"),
            r#"{"u1": {"balance": 777}}"#,
        )
        .unwrap();

        let ledger = ledger(dir.path());
        let account = ledger.account(&actor("u1"));
        assert_eq!(account.balance, 777);
        assert_eq!(account.bank, 0);
        assert!(account.last_daily.is_none());
        assert!(account.last_activity.is_empty());
    }
}
