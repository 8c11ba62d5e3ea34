//! Tier/archetype-driven loot for defeated enemies

use crate::affix::AffixInitializer;
use crate::error::LootError;
use crate::item::{ItemTemplate, Rarity, RarityWeights};
use crate::roller::{degrade, LootResult, LootRoller, SourceInfo};
use crate::table::{CurrencyAmount, RollCount};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Drop settings for one enemy tier (trash, elite, boss, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Picks from the shared pool
    pub drop_count: RollCount,
    pub rarity_weights: RarityWeights,
    pub archetype_bonus_chance: f64,
    pub legendary_base_chance: f64,
    /// Added to the legendary chance per point of luck
    pub legendary_luck_bonus: f64,
    pub currency: Option<CurrencyAmount>,
    pub currency_name: String,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            drop_count: RollCount::Fixed(1),
            rarity_weights: RarityWeights::default(),
            archetype_bonus_chance: 0.0,
            legendary_base_chance: 0.0,
            legendary_luck_bonus: 0.001,
            currency: None,
            currency_name: "gold".to_string(),
        }
    }
}

impl TierConfig {
    pub fn legendary_chance(&self, luck: f64) -> f64 {
        let chance = self.legendary_base_chance + luck * self.legendary_luck_bonus;
        if chance.is_nan() {
            0.0
        } else {
            chance.clamp(0.0, 1.0)
        }
    }
}

/// Template ids the combat roll draws from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPools {
    pub shared: Vec<String>,
    pub archetypes: HashMap<String, Vec<String>>,
    pub world_legendary: Vec<String>,
}

impl ItemPools {
    pub fn all_templates(&self) -> impl Iterator<Item = &str> {
        self.shared
            .iter()
            .chain(self.archetypes.values().flatten())
            .chain(&self.world_legendary)
            .map(String::as_str)
    }
}

impl<'r, A: AffixInitializer> LootRoller<'r, A> {
    /// Loot for a defeated enemy of `tier`.
    ///
    /// Shared-pool picks, then an optional archetype pick, then an optional
    /// world legendary, then currency. Each gated step is its own trial and a
    /// missing pool only skips that step.
    pub fn roll_from_combat<R: Rng + ?Sized>(
        &self,
        tier: &str,
        archetype: Option<&str>,
        luck: f64,
        source: SourceInfo,
        rng: &mut R,
    ) -> Vec<LootResult> {
        let registry = self.registry();
        let Some(config) = registry.get_tier(tier) else {
            degrade(LootError::UnknownTier(tier.to_string()));
            return Vec::new();
        };
        let source_name = format!("combat:{tier}");
        let pools = registry.pools();
        let mut results = Vec::new();

        let count = config.drop_count.roll(rng);
        if count > 0 {
            let shared = self.resolve_pool(&pools.shared);
            if shared.is_empty() {
                degrade(LootError::EmptyPool {
                    table: source_name.clone(),
                    pool: "shared",
                });
            } else {
                for _ in 0..count {
                    if let Some(template) = shared.choose(rng) {
                        let rarity = config.rarity_weights.roll(rng);
                        results.push(self.combat_item(template, source, rarity, &source_name, rng));
                    }
                }
            }
        }

        if let Some(archetype) = archetype {
            if rng.gen::<f64>() < config.archetype_bonus_chance {
                let pool = pools
                    .archetypes
                    .get(archetype)
                    .map(|ids| self.resolve_pool(ids))
                    .unwrap_or_default();
                match pool.choose(rng) {
                    Some(template) => {
                        let rarity = config.rarity_weights.roll(rng);
                        results.push(self.combat_item(template, source, rarity, &source_name, rng));
                    }
                    None => degrade(LootError::EmptyPool {
                        table: source_name.clone(),
                        pool: "archetype",
                    }),
                }
            }
        }

        if rng.gen::<f64>() < config.legendary_chance(luck) {
            let pool = self.resolve_pool(&pools.world_legendary);
            match pool.choose(rng) {
                Some(template) => results.push(self.combat_item(
                    template,
                    source,
                    Some(Rarity::Legendary),
                    &source_name,
                    rng,
                )),
                None => degrade(LootError::EmptyPool {
                    table: source_name.clone(),
                    pool: "world_legendary",
                }),
            }
        }

        if let Some(amount) = &config.currency {
            let rolled = amount.roll(source.stamp_level(), rng);
            if rolled > 0 {
                results.push(LootResult::Currency {
                    currency: config.currency_name.clone(),
                    amount: rolled as u64,
                    source: source_name.clone(),
                });
            } else {
                degrade(LootError::ZeroAmount {
                    table: source_name.clone(),
                    amount: rolled,
                });
            }
        }

        tracing::debug!(tier, archetype, results = results.len(), "rolled combat loot");
        results
    }

    fn resolve_pool(&self, ids: &[String]) -> Vec<&'r ItemTemplate> {
        let registry = self.registry();
        ids.iter().filter_map(|id| registry.get_template(id)).collect()
    }

    fn combat_item<R: Rng + ?Sized>(
        &self,
        template: &ItemTemplate,
        source: SourceInfo,
        rarity: Option<Rarity>,
        source_name: &str,
        rng: &mut R,
    ) -> LootResult {
        LootResult::Item {
            item: self.generate_item(template, source, rarity, rng),
            quantity: 1,
            source: source_name.to_string(),
        }
    }
}
