//! Loot tables, drop entries and weighted selection

use crate::item::Rarity;
use crate::registry::TableRegistry;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Anything that can take part in a roulette-wheel selection
pub trait Weighted {
    fn weight(&self) -> u32;
}

/// Roulette-wheel selection over the entries accepted by `is_valid`.
///
/// Draws `r` in `[0, total)` and returns the first entry whose running total
/// strictly exceeds `r`. Returns `None` when the valid entries weigh nothing.
pub fn select_weighted<'a, T, F, R>(entries: &'a [T], is_valid: F, rng: &mut R) -> Option<&'a T>
where
    T: Weighted,
    F: Fn(&T) -> bool,
    R: Rng + ?Sized,
{
    let total: u64 = entries
        .iter()
        .filter(|&e| is_valid(e))
        .map(|e| e.weight() as u64)
        .sum();
    if total == 0 {
        return None;
    }

    let r = rng.gen_range(0..total);
    let mut accumulated = 0u64;
    for entry in entries.iter().filter(|&e| is_valid(e)) {
        accumulated += entry.weight() as u64;
        if accumulated > r {
            return Some(entry);
        }
    }

    None
}

/// Inclusive integer range used by roll counts and quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// How many weighted draws a table makes per roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RollCount {
    Fixed(u32),
    Range(CountRange),
}

impl Default for RollCount {
    fn default() -> Self {
        RollCount::Fixed(1)
    }
}

impl RollCount {
    pub fn range(min: u32, max: u32) -> Self {
        RollCount::Range(CountRange { min, max })
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            RollCount::Fixed(n) => *n,
            RollCount::Range(range) => range.roll(rng),
        }
    }
}

/// Stack size of an item drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Fixed(u32),
    Range(CountRange),
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::Fixed(1)
    }
}

impl Quantity {
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            Quantity::Fixed(n) => *n,
            Quantity::Range(range) => range.roll(rng),
        }
    }
}

/// Currency amount: a uniform roll in `[min, max]` plus a level-scaled bonus.
/// A negative `min` gives the table a chance to roll nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub min: i64,
    pub max: i64,
    #[serde(default)]
    pub per_level: f64,
}

impl CurrencyAmount {
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            per_level: 0.0,
        }
    }

    pub fn roll<R: Rng + ?Sized>(&self, source_level: Option<u32>, rng: &mut R) -> i64 {
        let base = if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        };
        let scaled = match source_level {
            Some(level) if level > 0 => (self.per_level * level as f64).round() as i64,
            _ => 0,
        };
        base.saturating_add(scaled)
    }
}

fn default_currency() -> String {
    "gold".to_string()
}

/// What a drop entry produces when it is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropKind {
    Item {
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        forced_rarity: Option<Rarity>,
        #[serde(default)]
        quantity: Quantity,
    },
    Currency {
        #[serde(default = "default_currency")]
        currency: String,
        amount: CurrencyAmount,
    },
    NestedTable {
        table: String,
    },
    Nothing,
}

fn default_weight() -> u32 {
    1
}

/// One entry of a loot pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootDrop {
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(flatten)]
    pub kind: DropKind,
}

impl Weighted for LootDrop {
    fn weight(&self) -> u32 {
        self.weight
    }
}

impl LootDrop {
    pub fn item(template: impl Into<String>) -> Self {
        Self {
            weight: 1,
            kind: DropKind::Item {
                template: Some(template.into()),
                forced_rarity: None,
                quantity: Quantity::default(),
            },
        }
    }

    pub fn currency(min: i64, max: i64) -> Self {
        Self {
            weight: 1,
            kind: DropKind::Currency {
                currency: default_currency(),
                amount: CurrencyAmount::new(min, max),
            },
        }
    }

    pub fn nested(table: impl Into<String>) -> Self {
        Self {
            weight: 1,
            kind: DropKind::NestedTable {
                table: table.into(),
            },
        }
    }

    pub fn nothing() -> Self {
        Self {
            weight: 1,
            kind: DropKind::Nothing,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Only meaningful on item drops; other kinds are returned unchanged.
    pub fn with_forced_rarity(mut self, rarity: Rarity) -> Self {
        if let DropKind::Item { forced_rarity, .. } = &mut self.kind {
            *forced_rarity = Some(rarity);
        }
        self
    }

    /// Only meaningful on item drops; other kinds are returned unchanged.
    pub fn with_quantity(mut self, qty: Quantity) -> Self {
        if let DropKind::Item { quantity, .. } = &mut self.kind {
            *quantity = qty;
        }
        self
    }

    /// Whether this entry can produce anything against `registry`.
    /// Invalid entries are skipped by every pool.
    pub fn is_valid(&self, registry: &TableRegistry) -> bool {
        match &self.kind {
            DropKind::Item { template, .. } => template
                .as_deref()
                .is_some_and(|id| registry.get_template(id).is_some()),
            DropKind::NestedTable { table } => registry.get_table(table).is_some(),
            DropKind::Currency { .. } | DropKind::Nothing => true,
        }
    }
}

/// A named drop table with its three pools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTable {
    pub name: String,
    /// Every valid entry is resolved once per roll
    pub guaranteed: Vec<LootDrop>,
    /// Drawn from with replacement, `weighted_rolls` times
    pub weighted: Vec<LootDrop>,
    pub weighted_rolls: RollCount,
    /// One draw when the bonus trial succeeds
    pub bonus: Vec<LootDrop>,
    pub base_bonus_chance: f64,
}

impl LootTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_guaranteed(mut self, drops: Vec<LootDrop>) -> Self {
        self.guaranteed = drops;
        self
    }

    pub fn with_weighted(mut self, drops: Vec<LootDrop>, rolls: RollCount) -> Self {
        self.weighted = drops;
        self.weighted_rolls = rolls;
        self
    }

    pub fn with_bonus(mut self, drops: Vec<LootDrop>, base_chance: f64) -> Self {
        self.bonus = drops;
        self.base_bonus_chance = base_chance;
        self
    }

    /// Names of every table referenced by a nested drop in any pool
    pub fn nested_references(&self) -> impl Iterator<Item = &str> {
        self.guaranteed
            .iter()
            .chain(&self.weighted)
            .chain(&self.bonus)
            .filter_map(|d| match &d.kind {
                DropKind::NestedTable { table } => Some(table.as_str()),
                _ => None,
            })
    }

    /// Template ids referenced by item drops in any pool
    pub fn template_references(&self) -> impl Iterator<Item = &str> {
        self.guaranteed
            .iter()
            .chain(&self.weighted)
            .chain(&self.bonus)
            .filter_map(|d| match &d.kind {
                DropKind::Item { template, .. } => template.as_deref(),
                _ => None,
            })
    }
}
