//! Drop statistics aggregated over many rolls

use crate::item::Rarity;
use crate::roller::LootResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated statistics from repeated rolls of the same request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropStats {
    pub runs: usize,
    pub avg_results: f64,
    pub empty_rate: f64,
    pub avg_items: f64,
    pub avg_currency: f64,
    pub min_item_level: u32,
    pub max_item_level: u32,
    pub avg_item_level: f64,
    pub rarity_counts: BTreeMap<Rarity, u64>,
    /// How many rolls produced each template at least once
    pub template_hits: BTreeMap<String, u64>,
}

impl DropStats {
    /// Aggregate the results of `rolls`, one entry per roll
    pub fn from_rolls(rolls: &[Vec<LootResult>]) -> Self {
        if rolls.is_empty() {
            return Self::default();
        }

        let n = rolls.len() as f64;
        let mut stats = Self {
            runs: rolls.len(),
            ..Self::default()
        };

        let mut total_results = 0usize;
        let mut empty = 0usize;
        let mut items = 0u64;
        let mut currency = 0u64;
        let mut level_sum = 0u64;
        let mut min_level = u32::MAX;
        let mut max_level = 0u32;

        for roll in rolls {
            total_results += roll.len();
            if roll.is_empty() {
                empty += 1;
            }

            let mut seen: Vec<&str> = Vec::new();
            for result in roll {
                match result {
                    LootResult::Item { item, quantity, .. } => {
                        items += *quantity as u64;
                        level_sum += item.item_level as u64;
                        min_level = min_level.min(item.item_level);
                        max_level = max_level.max(item.item_level);
                        *stats.rarity_counts.entry(item.rarity).or_default() += 1;
                        if !seen.contains(&item.template_id.as_str()) {
                            seen.push(&item.template_id);
                        }
                    }
                    LootResult::Currency { amount, .. } => currency += amount,
                }
            }
            for id in seen {
                *stats.template_hits.entry(id.to_string()).or_default() += 1;
            }
        }

        let generated: u64 = stats.rarity_counts.values().sum();
        stats.avg_results = total_results as f64 / n;
        stats.empty_rate = empty as f64 / n;
        stats.avg_items = items as f64 / n;
        stats.avg_currency = currency as f64 / n;
        if generated > 0 {
            stats.min_item_level = min_level;
            stats.max_item_level = max_level;
            stats.avg_item_level = level_sum as f64 / generated as f64;
        }
        stats
    }

    /// Fraction of rolls that dropped `template_id`
    pub fn hit_rate(&self, template_id: &str) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.template_hits.get(template_id).copied().unwrap_or(0) as f64 / self.runs as f64
    }

    /// Share of generated items with `rarity`
    pub fn rarity_share(&self, rarity: Rarity) -> f64 {
        let total: u64 = self.rarity_counts.values().sum();
        if total == 0 {
            return 0.0;
        }
        self.rarity_counts.get(&rarity).copied().unwrap_or(0) as f64 / total as f64
    }
}
