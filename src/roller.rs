//! Loot table rolling and item stamping

use crate::affix::{AffixInitializer, AffixTable};
use crate::error::{LootError, Result};
use crate::item::{Item, ItemTemplate, Rarity};
use crate::registry::TableRegistry;
use crate::table::{select_weighted, DropKind, LootDrop};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Nested tables deeper than this resolve to nothing, which also breaks cycles.
pub const MAX_NESTING_DEPTH: usize = 8;

/// Player-side inputs that raise the bonus pool's chance
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollModifiers {
    pub luck: f64,
    pub magic_find: f64,
}

impl RollModifiers {
    pub fn new(luck: f64, magic_find: f64) -> Self {
        Self { luck, magic_find }
    }

    /// `clamp(base + luck% + magic_find%, 0, 1)`
    pub fn bonus_chance(&self, base_chance: f64) -> f64 {
        let chance = base_chance + self.luck * 0.01 + self.magic_find * 0.01;
        if chance.is_nan() {
            0.0
        } else {
            chance.clamp(0.0, 1.0)
        }
    }
}

/// Where the loot comes from. Unset (or zero) fields leave the template's
/// defaults alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceInfo {
    pub level: Option<u32>,
    pub region: Option<u8>,
}

impl SourceInfo {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at_level(level: u32) -> Self {
        Self {
            level: Some(level),
            region: None,
        }
    }

    pub fn with_region(mut self, region: u8) -> Self {
        self.region = Some(region);
        self
    }

    pub fn stamp_level(&self) -> Option<u32> {
        self.level.filter(|&l| l > 0)
    }

    pub fn stamp_region(&self) -> Option<u8> {
        self.region.filter(|&r| r > 0)
    }
}

/// One concrete drop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LootResult {
    Item {
        item: Item,
        quantity: u32,
        source: String,
    },
    Currency {
        currency: String,
        amount: u64,
        source: String,
    },
}

impl LootResult {
    pub fn source(&self) -> &str {
        match self {
            LootResult::Item { source, .. } | LootResult::Currency { source, .. } => source,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            LootResult::Item { item, .. } => Some(item),
            LootResult::Currency { .. } => None,
        }
    }

    pub fn currency_amount(&self) -> Option<u64> {
        match self {
            LootResult::Currency { amount, .. } => Some(*amount),
            LootResult::Item { .. } => None,
        }
    }
}

/// Log a roll-time degradation. None of these abort a roll.
pub(crate) fn degrade(err: LootError) {
    match err {
        LootError::EmptyPool { .. } | LootError::ZeroAmount { .. } => {
            tracing::debug!(error = %err, "loot step produced nothing");
        }
        _ => tracing::warn!(error = %err, "loot step skipped"),
    }
}

/// Rolls tables from a registry.
///
/// The roller holds no state of its own: every call only advances the caller's
/// RNG, so one roller can be shared across threads as long as each thread
/// brings its own generator.
#[derive(Debug)]
pub struct LootRoller<'r, A: AffixInitializer = AffixTable> {
    registry: &'r TableRegistry,
    affixes: &'r A,
}

impl<'r> LootRoller<'r> {
    /// Roller using the registry's own affix table
    pub fn new(registry: &'r TableRegistry) -> Self {
        Self {
            registry,
            affixes: registry.affixes(),
        }
    }
}

impl<'r, A: AffixInitializer> LootRoller<'r, A> {
    pub fn with_affixes(registry: &'r TableRegistry, affixes: &'r A) -> Self {
        Self { registry, affixes }
    }

    pub fn registry(&self) -> &'r TableRegistry {
        self.registry
    }

    /// Roll a table: guaranteed drops first, then the weighted draws, then the
    /// bonus draw. An unknown table yields no results.
    pub fn roll<R: Rng + ?Sized>(
        &self,
        table: &str,
        modifiers: &RollModifiers,
        source: SourceInfo,
        rng: &mut R,
    ) -> Vec<LootResult> {
        self.roll_at_depth(table, modifiers, source, 0, rng)
    }

    /// Roll a table with the source level derived from a region
    pub fn roll_for_region<R: Rng + ?Sized>(
        &self,
        table: &str,
        modifiers: &RollModifiers,
        region: u8,
        difficulty_bias: f64,
        rng: &mut R,
    ) -> Vec<LootResult> {
        let level = self
            .registry
            .scaling()
            .get_item_level_for_region(region, difficulty_bias);
        let source = SourceInfo::at_level(level).with_region(region);
        self.roll(table, modifiers, source, rng)
    }

    /// Resolve a single drop entry, outside of any pool
    pub fn process<R: Rng + ?Sized>(
        &self,
        drop: &LootDrop,
        source_name: &str,
        source: SourceInfo,
        rng: &mut R,
    ) -> Option<LootResult> {
        self.process_at_depth(drop, source_name, source, 0, rng)
    }

    /// Generate one item straight from a template, bypassing tables.
    /// The region defaults to 1 when the source has none.
    pub fn generate_drop<R: Rng + ?Sized>(
        &self,
        template: &ItemTemplate,
        source: SourceInfo,
        rarity_override: Option<Rarity>,
        rng: &mut R,
    ) -> LootResult {
        let source = SourceInfo {
            region: source.region.or(Some(1)),
            ..source
        };
        LootResult::Item {
            item: self.generate_item(template, source, rarity_override, rng),
            quantity: 1,
            source: "generated".to_string(),
        }
    }

    /// Copy a template and stamp rarity, level, region and affixes on it
    pub(crate) fn generate_item<R: Rng + ?Sized>(
        &self,
        template: &ItemTemplate,
        source: SourceInfo,
        rarity_override: Option<Rarity>,
        rng: &mut R,
    ) -> Item {
        let rarity = rarity_override
            .or(template.rarity)
            .or_else(|| self.registry.rarity_weights().roll(rng))
            .unwrap_or(Rarity::Common);
        let mut item = template.instantiate(rarity);

        let stamping = self.registry.stamping();
        if let Some(level) = source.stamp_level() {
            let spread = stamping.level_spread as i64;
            let jitter = rng.gen_range(-spread..=spread);
            item.item_level = stamping.stamp_level(level, jitter);
        }
        item.required_level = stamping.required_level(item.item_level);
        if let Some(region) = source.stamp_region() {
            item.region = Some(region);
        }

        self.affixes.initialize_affixes(&mut item, rng);
        item
    }

    fn roll_at_depth<R: Rng + ?Sized>(
        &self,
        table: &str,
        modifiers: &RollModifiers,
        source: SourceInfo,
        depth: usize,
        rng: &mut R,
    ) -> Vec<LootResult> {
        let Some(loot_table) = self.registry.get_table(table) else {
            degrade(LootError::TableNotFound(table.to_string()));
            return Vec::new();
        };
        let name = loot_table.name.as_str();
        let is_valid = |d: &LootDrop| d.is_valid(self.registry);
        let mut results = Vec::new();

        for drop in &loot_table.guaranteed {
            if !is_valid(drop) {
                tracing::debug!(table = %name, drop = ?drop.kind, "skipping invalid guaranteed drop");
                continue;
            }
            results.extend(self.process_at_depth(drop, name, source, depth, rng));
        }

        let rolls = loot_table.weighted_rolls.roll(rng);
        for _ in 0..rolls {
            let Some(drop) = select_weighted(&loot_table.weighted, is_valid, rng) else {
                // Every remaining draw would fail the same way
                degrade(LootError::EmptyPool {
                    table: name.to_string(),
                    pool: "weighted",
                });
                break;
            };
            results.extend(self.process_at_depth(drop, name, source, depth, rng));
        }

        let bonus_ready = loot_table
            .bonus
            .iter()
            .any(|d| d.weight > 0 && is_valid(d));
        if bonus_ready {
            let chance = modifiers.bonus_chance(loot_table.base_bonus_chance);
            if rng.gen::<f64>() < chance {
                if let Some(drop) = select_weighted(&loot_table.bonus, is_valid, rng) {
                    results.extend(self.process_at_depth(drop, name, source, depth, rng));
                }
            }
        }

        tracing::trace!(table = %name, depth, results = results.len(), "rolled loot table");
        results
    }

    fn process_at_depth<R: Rng + ?Sized>(
        &self,
        drop: &LootDrop,
        source_name: &str,
        source: SourceInfo,
        depth: usize,
        rng: &mut R,
    ) -> Option<LootResult> {
        match self.resolve(drop, source_name, source, depth, rng) {
            Ok(result) => result,
            Err(err) => {
                degrade(err);
                None
            }
        }
    }

    fn resolve<R: Rng + ?Sized>(
        &self,
        drop: &LootDrop,
        source_name: &str,
        source: SourceInfo,
        depth: usize,
        rng: &mut R,
    ) -> Result<Option<LootResult>> {
        match &drop.kind {
            DropKind::Item {
                template,
                forced_rarity,
                quantity,
            } => {
                let found = template
                    .as_deref()
                    .and_then(|id| self.registry.get_template(id))
                    .ok_or_else(|| LootError::InvalidTemplate {
                        table: source_name.to_string(),
                        template: template.clone(),
                    })?;
                let item = self.generate_item(found, source, *forced_rarity, rng);
                Ok(Some(LootResult::Item {
                    item,
                    quantity: quantity.roll(rng),
                    source: source_name.to_string(),
                }))
            }
            DropKind::Currency { currency, amount } => {
                let amount = amount.roll(source.stamp_level(), rng);
                if amount <= 0 {
                    return Err(LootError::ZeroAmount {
                        table: source_name.to_string(),
                        amount,
                    });
                }
                Ok(Some(LootResult::Currency {
                    currency: currency.clone(),
                    amount: amount as u64,
                    source: source_name.to_string(),
                }))
            }
            DropKind::NestedTable { table } => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(LootError::NestingTooDeep {
                        table: table.clone(),
                        limit: MAX_NESTING_DEPTH,
                    });
                }
                // The nested table stands in for one outcome: keep its first result only
                let nested =
                    self.roll_at_depth(table, &RollModifiers::default(), source, depth + 1, rng);
                Ok(nested.into_iter().next())
            }
            DropKind::Nothing => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affix::NoAffixes;
    use crate::table::{LootTable, RollCount};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn registry() -> TableRegistry {
        let mut registry = TableRegistry::new();
        registry.register_template("sword", ItemTemplate::new("", "Sword").with_base_level(5));
        registry.register_template(
            "crown",
            ItemTemplate::new("", "Crown").with_rarity(Rarity::Epic),
        );
        registry
    }

    #[test]
    fn unknown_table_rolls_nothing() {
        let registry = registry();
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(1);
        let results = roller.roll("nope", &RollModifiers::default(), SourceInfo::none(), &mut rng);
        assert!(results.is_empty());
    }

    #[test]
    fn guaranteed_results_come_first() {
        let mut registry = registry();
        registry.register_table(
            "t",
            LootTable::new("t")
                .with_guaranteed(vec![LootDrop::item("crown")])
                .with_weighted(vec![LootDrop::currency(5, 5)], RollCount::Fixed(3)),
        );
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(2);
        let results = roller.roll("t", &RollModifiers::default(), SourceInfo::none(), &mut rng);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_item().unwrap().template_id, "crown");
        assert!(results[1..].iter().all(|r| r.currency_amount() == Some(5)));
    }

    #[test]
    fn invalid_guaranteed_drops_are_skipped() {
        let mut registry = registry();
        let missing = LootDrop {
            weight: 1,
            kind: DropKind::Item {
                template: None,
                forced_rarity: None,
                quantity: Default::default(),
            },
        };
        registry.register_table(
            "t",
            LootTable::new("t")
                .with_guaranteed(vec![missing, LootDrop::item("ghost"), LootDrop::item("sword")])
                .with_weighted(Vec::new(), RollCount::Fixed(0)),
        );
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(3);
        let results = roller.roll("t", &RollModifiers::default(), SourceInfo::none(), &mut rng);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn zero_currency_is_dropped() {
        let mut registry = registry();
        registry.register_table(
            "t",
            LootTable::new("t").with_guaranteed(vec![LootDrop::currency(-5, 0)]),
        );
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..50 {
            let results = roller.roll("t", &RollModifiers::default(), SourceInfo::none(), &mut rng);
            assert!(results.is_empty());
        }
    }

    #[test]
    fn nothing_drops_never_appear() {
        let mut registry = registry();
        registry.register_table(
            "t",
            LootTable::new("t").with_weighted(vec![LootDrop::nothing()], RollCount::Fixed(5)),
        );
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(roller
            .roll("t", &RollModifiers::default(), SourceInfo::none(), &mut rng)
            .is_empty());
    }

    #[test]
    fn self_referencing_table_terminates() {
        let mut registry = registry();
        registry.register_table(
            "loop",
            LootTable::new("loop").with_guaranteed(vec![LootDrop::nested("loop")]),
        );
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(6);
        let results = roller.roll("loop", &RollModifiers::default(), SourceInfo::none(), &mut rng);
        assert!(results.is_empty());
    }

    #[test]
    fn rarity_priority_is_forced_then_template() {
        let mut registry = registry();
        registry.register_table(
            "t",
            LootTable::new("t").with_guaranteed(vec![
                LootDrop::item("crown"),
                LootDrop::item("crown").with_forced_rarity(Rarity::Common),
            ]),
        );
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(7);
        let results = roller.roll("t", &RollModifiers::default(), SourceInfo::none(), &mut rng);
        assert_eq!(results[0].as_item().unwrap().rarity, Rarity::Epic);
        assert_eq!(results[1].as_item().unwrap().rarity, Rarity::Common);
    }

    #[test]
    fn unstamped_items_keep_template_level() {
        let registry = registry();
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(8);
        let drop = LootDrop::item("sword");
        let result = roller.process(&drop, "test", SourceInfo::none(), &mut rng).unwrap();
        let item = result.as_item().unwrap();
        assert_eq!(item.item_level, 5);
        assert_eq!(item.required_level, 2);
        assert_eq!(item.region, None);
    }

    #[test]
    fn generate_drop_defaults_region_to_one() {
        let registry = registry();
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(9);
        let template = registry.get_template("sword").unwrap();

        let result = roller.generate_drop(template, SourceInfo::at_level(30), Some(Rarity::Rare), &mut rng);
        let item = result.as_item().unwrap();
        assert_eq!(item.region, Some(1));
        assert_eq!(item.rarity, Rarity::Rare);
        assert!((27..=33).contains(&item.item_level));
        assert_eq!(result.source(), "generated");

        let result = roller.generate_drop(
            template,
            SourceInfo::at_level(30).with_region(4),
            None,
            &mut rng,
        );
        assert_eq!(result.as_item().unwrap().region, Some(4));
    }

    #[test]
    fn bonus_chance_is_clamped() {
        assert_eq!(RollModifiers::new(0.0, 0.0).bonus_chance(0.25), 0.25);
        assert!((RollModifiers::new(10.0, 5.0).bonus_chance(0.1) - 0.25).abs() < 1e-9);
        assert_eq!(RollModifiers::new(500.0, 0.0).bonus_chance(0.1), 1.0);
        assert_eq!(RollModifiers::new(-500.0, 0.0).bonus_chance(0.1), 0.0);
        assert_eq!(RollModifiers::new(f64::NAN, 0.0).bonus_chance(0.1), 0.0);
    }

    #[test]
    fn region_roll_uses_scaling() {
        let mut registry = registry();
        registry.register_table("t", LootTable::new("t").with_guaranteed(vec![LootDrop::item("sword")]));
        let roller = LootRoller::with_affixes(&registry, &NoAffixes);
        let mut rng = SmallRng::seed_from_u64(10);
        let results = roller.roll_for_region("t", &RollModifiers::default(), 6, 1.0, &mut rng);
        let item = results[0].as_item().unwrap();
        assert_eq!(item.region, Some(6));
        assert!((97..=100).contains(&item.item_level));
    }
}
