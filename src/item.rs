//! Item templates, generated items and rarity tiers

use crate::table::{select_weighted, Weighted};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Item rarity, ordered from most to least common
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

// Content files are hand-written, so accept any casing
impl<'de> Deserialize<'de> for Rarity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Rarity::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &s,
                &["common", "uncommon", "rare", "epic", "legendary"],
            )
        })
    }
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "common" => Some(Rarity::Common),
            "uncommon" => Some(Rarity::Uncommon),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            "legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }

    /// Number of affix slots an item of this rarity gets
    pub fn affix_slots(self) -> usize {
        match self {
            Rarity::Common => 0,
            Rarity::Uncommon => 1,
            Rarity::Rare => 2,
            Rarity::Epic => 3,
            Rarity::Legendary => 4,
        }
    }

    /// Multiplier applied to affix values
    pub fn power_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.1,
            Rarity::Rare => 1.25,
            Rarity::Epic => 1.5,
            Rarity::Legendary => 2.0,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        };
        f.write_str(name)
    }
}

/// Relative weight per rarity for tier-driven rarity rolls.
///
/// An absent or empty map deserializes to the defaults. Once any rarity is
/// listed, the unlisted ones weigh zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RarityWeights {
    pub common: u32,
    pub uncommon: u32,
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self {
            common: 60,
            uncommon: 25,
            rare: 10,
            epic: 4,
            legendary: 1,
        }
    }
}

impl<'de> Deserialize<'de> for RarityWeights {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Listed {
            common: Option<u32>,
            uncommon: Option<u32>,
            rare: Option<u32>,
            epic: Option<u32>,
            legendary: Option<u32>,
        }

        let listed = Listed::deserialize(deserializer)?;
        let fields = [
            listed.common,
            listed.uncommon,
            listed.rare,
            listed.epic,
            listed.legendary,
        ];
        if fields.iter().all(Option::is_none) {
            return Ok(Self::default());
        }
        let [common, uncommon, rare, epic, legendary] = fields.map(|w| w.unwrap_or(0));
        Ok(Self {
            common,
            uncommon,
            rare,
            epic,
            legendary,
        })
    }
}

impl Weighted for (Rarity, u32) {
    fn weight(&self) -> u32 {
        self.1
    }
}

impl RarityWeights {
    pub fn get(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }

    /// Roll a rarity. `None` when every weight is zero.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Rarity> {
        let entries = Rarity::ALL.map(|r| (r, self.get(r)));
        select_weighted(&entries, |_| true, rng).map(|(r, _)| *r)
    }
}

/// Prototype an item is generated from. Never mutated by rolling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default = "default_base_level")]
    pub base_level: u32,
    #[serde(default)]
    pub rarity: Option<Rarity>,
}

fn default_base_level() -> u32 {
    1
}

impl ItemTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slot: None,
            base_level: 1,
            rarity: None,
        }
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn with_base_level(mut self, level: u32) -> Self {
        self.base_level = level;
        self
    }

    /// Make an unstamped copy of this template
    pub fn instantiate(&self, rarity: Rarity) -> Item {
        Item {
            template_id: self.id.clone(),
            name: self.name.clone(),
            slot: self.slot.clone(),
            item_level: self.base_level.clamp(1, 100),
            required_level: 1,
            region: None,
            rarity,
            affixes: Vec::new(),
        }
    }
}

/// A rolled affix on a generated item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affix {
    pub name: String,
    pub stat: String,
    pub value: i64,
}

/// A concrete item produced by a roll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub template_id: String,
    pub name: String,
    pub slot: Option<String>,
    pub item_level: u32,
    pub required_level: u32,
    pub region: Option<u8>,
    pub rarity: Rarity,
    pub affixes: Vec<Affix>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn rarity_parses_any_case() {
        assert_eq!(Rarity::parse("EPIC"), Some(Rarity::Epic));
        assert_eq!(Rarity::parse("Legendary"), Some(Rarity::Legendary));
        assert_eq!(Rarity::parse("mythic"), None);

        let r: Rarity = serde_json::from_str("\"Rare\"").unwrap();
        assert_eq!(r, Rarity::Rare);
        assert!(serde_json::from_str::<Rarity>("\"shiny\"").is_err());
    }

    #[test]
    fn rarity_ordering_matches_slots() {
        for pair in Rarity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].affix_slots() < pair[1].affix_slots());
        }
    }

    #[test]
    fn zero_weights_roll_nothing() {
        let weights = RarityWeights {
            common: 0,
            uncommon: 0,
            rare: 0,
            epic: 0,
            legendary: 0,
        };
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(weights.roll(&mut rng), None);
    }

    #[test]
    fn single_weight_always_wins() {
        let weights = RarityWeights {
            common: 0,
            uncommon: 0,
            rare: 0,
            epic: 5,
            legendary: 0,
        };
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(weights.roll(&mut rng), Some(Rarity::Epic));
        }
    }

    #[test]
    fn partial_weights_zero_the_rest() {
        let weights: RarityWeights = serde_yaml::from_str("{ legendary: 1 }").unwrap();
        assert_eq!(weights.common, 0);
        assert_eq!(weights.legendary, 1);
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            assert_eq!(weights.roll(&mut rng), Some(Rarity::Legendary));
        }

        let empty: RarityWeights = serde_yaml::from_str("{}").unwrap();
        assert_eq!(empty, RarityWeights::default());
    }

    #[test]
    fn instantiate_copies_template() {
        let template = ItemTemplate::new("iron_sword", "Iron Sword")
            .with_slot("weapon")
            .with_base_level(250);
        let item = template.instantiate(Rarity::Common);
        assert_eq!(item.template_id, "iron_sword");
        assert_eq!(item.slot.as_deref(), Some("weapon"));
        assert_eq!(item.item_level, 100);
        assert_eq!(template.base_level, 250);
    }
}
