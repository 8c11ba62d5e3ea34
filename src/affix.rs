//! Affix rolling for generated items

use crate::item::{Affix, Item, Rarity};
use crate::table::{select_weighted, Weighted};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fills the affix slots of a freshly stamped item.
///
/// Called once per generated item after level, region and rarity are set.
pub trait AffixInitializer {
    fn initialize_affixes<R: Rng + ?Sized>(&self, item: &mut Item, rng: &mut R);
}

/// Leaves every item without affixes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAffixes;

impl AffixInitializer for NoAffixes {
    fn initialize_affixes<R: Rng + ?Sized>(&self, _item: &mut Item, _rng: &mut R) {}
}

fn default_rarity() -> Rarity {
    Rarity::Common
}

fn default_affix_weight() -> u32 {
    10
}

/// One affix an item can roll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffixDef {
    pub name: String,
    pub stat: String,
    #[serde(default = "default_affix_weight")]
    pub weight: u32,
    #[serde(default)]
    pub min_level: u32,
    #[serde(default = "default_rarity")]
    pub min_rarity: Rarity,
    #[serde(default)]
    pub base_value: f64,
    #[serde(default)]
    pub per_level: f64,
}

impl Weighted for AffixDef {
    fn weight(&self) -> u32 {
        self.weight
    }
}

impl AffixDef {
    fn qualifies(&self, item: &Item) -> bool {
        item.item_level >= self.min_level && item.rarity >= self.min_rarity
    }
}

/// Level- and rarity-gated affix pool loaded from content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffixTable {
    pub defs: Vec<AffixDef>,
}

impl AffixTable {
    pub fn new(defs: Vec<AffixDef>) -> Self {
        Self { defs }
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl AffixInitializer for AffixTable {
    fn initialize_affixes<R: Rng + ?Sized>(&self, item: &mut Item, rng: &mut R) {
        item.affixes.clear();
        let slots = item.rarity.affix_slots();

        for _ in 0..slots {
            // No stat twice on the same item
            let pick = select_weighted(
                &self.defs,
                |def| def.qualifies(item) && !item.affixes.iter().any(|a| a.name == def.name),
                rng,
            );
            let Some(def) = pick else {
                tracing::debug!(
                    item = %item.template_id,
                    filled = item.affixes.len(),
                    slots,
                    "affix pool exhausted"
                );
                break;
            };

            let raw = (def.base_value + def.per_level * item.item_level as f64)
                * item.rarity.power_multiplier()
                * rng.gen_range(0.9..=1.1);
            item.affixes.push(Affix {
                name: def.name.clone(),
                stat: def.stat.clone(),
                value: raw.round() as i64,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemTemplate;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn def(name: &str, min_level: u32, min_rarity: Rarity) -> AffixDef {
        AffixDef {
            name: name.to_string(),
            stat: name.to_string(),
            weight: 10,
            min_level,
            min_rarity,
            base_value: 10.0,
            per_level: 1.0,
        }
    }

    fn item(level: u32, rarity: Rarity) -> Item {
        let mut item = ItemTemplate::new("ring", "Ring").instantiate(rarity);
        item.item_level = level;
        item
    }

    #[test]
    fn fills_slots_by_rarity() {
        let table = AffixTable::new(vec![
            def("might", 1, Rarity::Common),
            def("grit", 1, Rarity::Common),
            def("haste", 1, Rarity::Common),
            def("focus", 1, Rarity::Common),
        ]);
        let mut rng = SmallRng::seed_from_u64(11);
        for rarity in Rarity::ALL {
            let mut it = item(20, rarity);
            table.initialize_affixes(&mut it, &mut rng);
            assert_eq!(it.affixes.len(), rarity.affix_slots());
        }
    }

    #[test]
    fn no_duplicate_affixes() {
        let table = AffixTable::new(vec![def("might", 1, Rarity::Common), def("grit", 1, Rarity::Common)]);
        let mut rng = SmallRng::seed_from_u64(12);
        let mut it = item(20, Rarity::Legendary);
        table.initialize_affixes(&mut it, &mut rng);
        assert_eq!(it.affixes.len(), 2);
        assert_ne!(it.affixes[0].name, it.affixes[1].name);
    }

    #[test]
    fn respects_level_and_rarity_gates() {
        let table = AffixTable::new(vec![
            def("low", 1, Rarity::Common),
            def("deep", 50, Rarity::Common),
            def("mythic", 1, Rarity::Legendary),
        ]);
        let mut rng = SmallRng::seed_from_u64(13);
        for _ in 0..50 {
            let mut it = item(10, Rarity::Epic);
            table.initialize_affixes(&mut it, &mut rng);
            assert_eq!(it.affixes.len(), 1);
            assert_eq!(it.affixes[0].name, "low");
        }
    }

    #[test]
    fn values_scale_with_level() {
        let table = AffixTable::new(vec![def("might", 1, Rarity::Common)]);
        let mut rng = SmallRng::seed_from_u64(14);
        let mut it = item(40, Rarity::Uncommon);
        table.initialize_affixes(&mut it, &mut rng);
        // (10 + 40) * 1.1 * [0.9, 1.1]
        let value = it.affixes[0].value;
        assert!((49..=61).contains(&value), "value {value}");
    }

    #[test]
    fn no_affixes_is_a_noop() {
        let mut rng = SmallRng::seed_from_u64(15);
        let mut it = item(40, Rarity::Legendary);
        NoAffixes.initialize_affixes(&mut it, &mut rng);
        assert!(it.affixes.is_empty());
    }
}
