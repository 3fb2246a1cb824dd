//! Collectible cards: static catalog plus per-actor collections.
//!
//! The catalog (series, tiers, powers, values) is fixed at compile time; only
//! the per-actor collections are persisted. Draws are tier-weighted so rarer
//! tiers come up proportionally less often (SSR=1, SR=5, R=15, C=30).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CommandError;
use crate::store::PersistentStore;
use crate::transport::ActorId;

pub const CARDS_COLLECTION: &str = "cards";

/// Minimum interval between two card claims by the same actor
pub const CLAIM_COOLDOWN: Duration = Duration::from_secs(3 * 60 * 60);

/// Value assumed for a card that has left the catalog
const FALLBACK_VALUE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    C,
    R,
    SR,
    SSR,
}

impl Tier {
    /// Draw weight: rarer tiers are proportionally less likely
    pub fn weight(self) -> u32 {
        match self {
            Tier::C => 30,
            Tier::R => 15,
            Tier::SR => 5,
            Tier::SSR => 1,
        }
    }

    pub fn rarity(self) -> &'static str {
        match self {
            Tier::C => "Common",
            Tier::R => "Rare",
            Tier::SR => "Epic",
            Tier::SSR => "Legendary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::C => "C",
            Tier::R => "R",
            Tier::SR => "SR",
            Tier::SSR => "SSR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "C" => Some(Tier::C),
            "R" => Some(Tier::R),
            "SR" => Some(Tier::SR),
            "SSR" => Some(Tier::SSR),
            _ => None,
        }
    }
}

/// One entry of the static catalog
#[derive(Debug, Clone, Copy)]
pub struct CatalogCard {
    pub series: &'static str,
    pub name: &'static str,
    pub tier: Tier,
    pub power: u32,
    pub value: i64,
}

const CATALOG: &[CatalogCard] = &[
    // Dragons
    CatalogCard { series: "Dragons", name: "Fire Dragon", tier: Tier::SSR, power: 95, value: 1000 },
    CatalogCard { series: "Dragons", name: "Ice Dragon", tier: Tier::SR, power: 80, value: 500 },
    CatalogCard { series: "Dragons", name: "Earth Dragon", tier: Tier::R, power: 65, value: 200 },
    CatalogCard { series: "Dragons", name: "Dragon Whelp", tier: Tier::C, power: 30, value: 50 },
    // Warriors
    CatalogCard { series: "Warriors", name: "Sword Master", tier: Tier::SSR, power: 90, value: 900 },
    CatalogCard { series: "Warriors", name: "Shield Guardian", tier: Tier::SR, power: 75, value: 450 },
    CatalogCard { series: "Warriors", name: "Battle Monk", tier: Tier::R, power: 60, value: 180 },
    CatalogCard { series: "Warriors", name: "Town Recruit", tier: Tier::C, power: 25, value: 40 },
    // Mages
    CatalogCard { series: "Mages", name: "Archmage", tier: Tier::SSR, power: 100, value: 1200 },
    CatalogCard { series: "Mages", name: "Lightning Mage", tier: Tier::SR, power: 78, value: 480 },
    CatalogCard { series: "Mages", name: "Frost Mage", tier: Tier::R, power: 62, value: 190 },
    CatalogCard { series: "Mages", name: "Hedge Wizard", tier: Tier::C, power: 28, value: 45 },
];

pub fn catalog() -> &'static [CatalogCard] {
    CATALOG
}

pub fn series_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for card in CATALOG {
        if !names.contains(&card.series) {
            names.push(card.series);
        }
    }
    names
}

pub fn cards_in_series(series: &str) -> Vec<&'static CatalogCard> {
    CATALOG
        .iter()
        .filter(|c| c.series.eq_ignore_ascii_case(series))
        .collect()
}

pub fn find_card(name: &str, tier: Tier) -> Option<&'static CatalogCard> {
    CATALOG
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name) && c.tier == tier)
}

/// Draw one card from the catalog, weighted by tier.
pub fn draw_weighted<R: Rng>(rng: &mut R) -> &'static CatalogCard {
    let total: u32 = CATALOG.iter().map(|c| c.tier.weight()).sum();
    let mut roll = rng.gen_range(0..total);
    for card in CATALOG {
        let weight = card.tier.weight();
        if roll < weight {
            return card;
        }
        roll -= weight;
    }
    // Unreachable while the catalog is non-empty
    &CATALOG[0]
}

/// A card held by an actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedCard {
    pub series: String,
    pub name: String,
    pub tier: Tier,
    pub obtained_at: DateTime<Utc>,
}

impl OwnedCard {
    pub fn value(&self) -> i64 {
        find_card(&self.name, self.tier)
            .map(|c| c.value)
            .unwrap_or(FALLBACK_VALUE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCollection {
    #[serde(default)]
    pub cards: Vec<OwnedCard>,
    #[serde(default = "default_enabled")]
    pub cards_enabled: bool,
    #[serde(default)]
    pub last_claim: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl Default for CardCollection {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            cards_enabled: true,
            last_claim: None,
        }
    }
}

impl CardCollection {
    pub fn deck_value(&self) -> i64 {
        self.cards.iter().map(|c| c.value()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub card: &'static CatalogCard,
    pub total_cards: usize,
}

#[derive(Debug, Clone)]
pub struct CardLeaderboardEntry {
    pub actor: String,
    pub card_count: usize,
    pub deck_value: i64,
}

/// Per-actor collections, persisted as one collection file.
pub struct CardLedger {
    store: PersistentStore,
    collections: Mutex<HashMap<String, CardCollection>>,
}

impl CardLedger {
    pub fn new(store: PersistentStore) -> Self {
        let collections = store.load(CARDS_COLLECTION);
        Self {
            store,
            collections: Mutex::new(collections),
        }
    }

    fn mutate<R>(
        &self,
        actor: &ActorId,
        apply: impl FnOnce(&mut CardCollection) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections
            .entry(actor.as_str().to_string())
            .or_default();
        let result = apply(collection)?;
        self.store.save(CARDS_COLLECTION, &collections);
        Ok(result)
    }

    /// Claim one tier-weighted draw. Gated by a 3-hour window per actor.
    pub fn claim(&self, actor: &ActorId, now: DateTime<Utc>) -> Result<ClaimOutcome, CommandError> {
        self.mutate(actor, |collection| {
            if !collection.cards_enabled {
                return Err(CommandError::Usage(
                    "cards are disabled for you — enable with `cards on`".into(),
                ));
            }
            if let Some(last) = collection.last_claim {
                let elapsed = (now - last).to_std().unwrap_or_default();
                if elapsed < CLAIM_COOLDOWN {
                    return Err(CommandError::CooldownActive(CLAIM_COOLDOWN - elapsed));
                }
            }

            let card = draw_weighted(&mut rand::thread_rng());
            collection.cards.push(OwnedCard {
                series: card.series.to_string(),
                name: card.name.to_string(),
                tier: card.tier,
                obtained_at: now,
            });
            collection.last_claim = Some(now);

            info!(actor = %actor, card = card.name, tier = card.tier.label(), "card claimed");
            Ok(ClaimOutcome {
                card,
                total_cards: collection.cards.len(),
            })
        })
    }

    pub fn set_enabled(&self, actor: &ActorId, enabled: bool) -> Result<(), CommandError> {
        self.mutate(actor, |collection| {
            collection.cards_enabled = enabled;
            Ok(())
        })
    }

    /// Snapshot of an actor's collection (empty default if never touched).
    pub fn collection(&self, actor: &ActorId) -> CardCollection {
        self.collections
            .lock()
            .unwrap()
            .get(actor.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Card at a 1-based deck index.
    pub fn card_at(&self, actor: &ActorId, index: usize) -> Option<OwnedCard> {
        let collections = self.collections.lock().unwrap();
        let collection = collections.get(actor.as_str())?;
        if index == 0 {
            return None;
        }
        collection.cards.get(index - 1).cloned()
    }

    /// Top collectors by deck value; actors with no cards are skipped.
    pub fn leaderboard(&self, limit: usize) -> Vec<CardLeaderboardEntry> {
        let collections = self.collections.lock().unwrap();
        let mut entries: Vec<CardLeaderboardEntry> = collections
            .iter()
            .filter(|(_, c)| !c.cards.is_empty())
            .map(|(actor, c)| CardLeaderboardEntry {
                actor: actor.clone(),
                card_count: c.cards.len(),
                deck_value: c.deck_value(),
            })
            .collect();
        entries.sort_by(|a, b| b.deck_value.cmp(&a.deck_value).then(a.actor.cmp(&b.actor)));
        entries.truncate(limit);
        entries
    }
}
