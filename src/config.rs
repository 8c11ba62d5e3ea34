//! Content file structures for loading loot YAML/JSON files

use crate::affix::AffixDef;
use crate::combat::{ItemPools, TierConfig};
use crate::error::Result;
use crate::item::{ItemTemplate, RarityWeights};
use crate::table::LootTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Item-level stamping parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampingConfig {
    /// Maximum jitter either side of the source level
    pub level_spread: u32,
    /// How far below the item level the requirement sits
    pub required_level_grace: u32,
}

impl Default for StampingConfig {
    fn default() -> Self {
        Self {
            level_spread: 3,
            required_level_grace: 3,
        }
    }
}

impl StampingConfig {
    /// `clamp(source_level + jitter, 1, 100)`
    pub fn stamp_level(&self, source_level: u32, jitter: i64) -> u32 {
        (source_level as i64 + jitter).clamp(1, 100) as u32
    }

    /// `max(1, item_level - grace)`
    pub fn required_level(&self, item_level: u32) -> u32 {
        item_level.saturating_sub(self.required_level_grace).max(1)
    }
}

/// Inclusive item-level band of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBand {
    pub min: u32,
    pub max: u32,
}

/// Region to item-level mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub regions: Vec<LevelBand>,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        let bands = [(1, 15), (12, 30), (28, 48), (45, 65), (62, 82), (80, 100)];
        Self {
            regions: bands
                .iter()
                .map(|&(min, max)| LevelBand { min, max })
                .collect(),
        }
    }
}

impl ScalingConfig {
    /// Item level for a region, interpolated inside its band by `difficulty_bias` (0..=1).
    /// Out-of-range regions clamp to the first/last band.
    pub fn get_item_level_for_region(&self, region: u8, difficulty_bias: f64) -> u32 {
        let Some(last) = self.regions.len().checked_sub(1) else {
            return 1;
        };
        let idx = (region.max(1) as usize - 1).min(last);
        let band = self.regions[idx];
        let bias = if difficulty_bias.is_finite() {
            difficulty_bias.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let level = band.min as f64 + (band.max as f64 - band.min as f64) * bias;
        (level.round() as u32).clamp(1, 100)
    }
}

/// Full content file: templates, tables and the collaborators' settings.
///
/// Only `tables` is required:
/// ```yaml
/// templates:
///   iron_sword: { name: Iron Sword, slot: weapon }
/// tables:
///   goblin:
///     guaranteed:
///       - { type: currency, amount: { min: 1, max: 5 } }
///     weighted:
///       - { type: item, template: iron_sword, weight: 3 }
///       - { type: nothing, weight: 7 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LootConfig {
    #[serde(default)]
    pub templates: HashMap<String, ItemTemplate>,
    pub tables: HashMap<String, LootTable>,
    #[serde(default)]
    pub affixes: Vec<AffixDef>,
    #[serde(default)]
    pub tiers: HashMap<String, TierConfig>,
    #[serde(default)]
    pub pools: ItemPools,
    #[serde(default)]
    pub rarity_weights: RarityWeights,
    #[serde(default)]
    pub stamping: StampingConfig,
    #[serde(default)]
    pub scaling: ScalingConfig,
}

impl LootConfig {
    /// Load a content file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let path_str = path.as_ref().to_string_lossy().to_lowercase();

        if path_str.ends_with(".json") {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn stamping_clamps_to_level_range() {
        let stamping = StampingConfig::default();
        assert_eq!(stamping.stamp_level(1, -3), 1);
        assert_eq!(stamping.stamp_level(99, 3), 100);
        assert_eq!(stamping.stamp_level(50, -2), 48);
    }

    #[test]
    fn required_level_never_below_one() {
        let stamping = StampingConfig::default();
        assert_eq!(stamping.required_level(2), 1);
        assert_eq!(stamping.required_level(10), 7);
    }

    #[test]
    fn region_levels_follow_bands() {
        let scaling = ScalingConfig::default();
        assert_eq!(scaling.get_item_level_for_region(1, 0.0), 1);
        assert_eq!(scaling.get_item_level_for_region(1, 1.0), 15);
        assert_eq!(scaling.get_item_level_for_region(6, 1.0), 100);
        assert_eq!(scaling.get_item_level_for_region(3, 0.5), 38);
        // Clamped region and bias
        assert_eq!(scaling.get_item_level_for_region(0, -1.0), 1);
        assert_eq!(scaling.get_item_level_for_region(9, 2.0), 100);
    }

    #[test]
    fn empty_scaling_falls_back_to_one() {
        let scaling = ScalingConfig { regions: Vec::new() };
        assert_eq!(scaling.get_item_level_for_region(3, 0.5), 1);
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config = LootConfig::from_yaml("tables: {}").unwrap();
        assert!(config.tables.is_empty());
        assert_eq!(config.stamping, StampingConfig::default());
        assert_eq!(config.rarity_weights, RarityWeights::default());
        assert_eq!(config.scaling.regions.len(), 6);
    }

    #[test]
    fn loads_json_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"tables": {{"empty": {{}}}}, "stamping": {{"level_spread": 5}}}}"#
        )
        .unwrap();
        let config = LootConfig::from_file(file.path()).unwrap();
        assert!(config.tables.contains_key("empty"));
        assert_eq!(config.stamping.level_spread, 5);
        assert_eq!(config.stamping.required_level_grace, 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LootConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, crate::error::LootError::Io(_)));
    }
}
