//! Explicitly constructed, read-only store of loot content

use crate::affix::AffixTable;
use crate::combat::{ItemPools, TierConfig};
use crate::config::{LootConfig, ScalingConfig, StampingConfig};
use crate::error::Result;
use crate::item::{ItemTemplate, RarityWeights};
use crate::table::LootTable;
use std::collections::HashMap;
use std::path::Path;

/// Tables, templates and tier settings, loaded once and shared by reference
/// with every roller. Nothing in here changes while rolling.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, LootTable>,
    templates: HashMap<String, ItemTemplate>,
    tiers: HashMap<String, TierConfig>,
    pools: ItemPools,
    affixes: AffixTable,
    rarity_weights: RarityWeights,
    stamping: StampingConfig,
    scaling: ScalingConfig,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a parsed content file.
    ///
    /// Map keys win over any `name`/`id` written inside the entries.
    /// Dangling references are reported but kept; rolls skip them.
    pub fn from_config(config: LootConfig) -> Self {
        let mut registry = Self {
            tiers: config.tiers,
            pools: config.pools,
            affixes: AffixTable::new(config.affixes),
            rarity_weights: config.rarity_weights,
            stamping: config.stamping,
            scaling: config.scaling,
            ..Self::default()
        };
        for (id, template) in config.templates {
            registry.register_template(id, template);
        }
        for (name, table) in config.tables {
            registry.register_table(name, table);
        }

        let dangling = registry.report_dangling_references();
        tracing::info!(
            tables = registry.tables.len(),
            templates = registry.templates.len(),
            tiers = registry.tiers.len(),
            dangling,
            "loot registry loaded"
        );
        registry
    }

    /// Load and build from a YAML or JSON content file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = LootConfig::from_file(&path)?;
        tracing::debug!(path = %path.as_ref().display(), "parsed loot content");
        Ok(Self::from_config(config))
    }

    pub fn register_table(&mut self, name: impl Into<String>, mut table: LootTable) {
        let name = name.into();
        table.name = name.clone();
        if self.tables.insert(name.clone(), table).is_some() {
            tracing::warn!(table = %name, "loot table redefined");
        }
    }

    pub fn register_template(&mut self, id: impl Into<String>, mut template: ItemTemplate) {
        let id = id.into();
        template.id = id.clone();
        if self.templates.insert(id.clone(), template).is_some() {
            tracing::warn!(template = %id, "item template redefined");
        }
    }

    pub fn register_tier(&mut self, name: impl Into<String>, tier: TierConfig) {
        self.tiers.insert(name.into(), tier);
    }

    pub fn set_pools(&mut self, pools: ItemPools) {
        self.pools = pools;
    }

    pub fn set_affixes(&mut self, affixes: AffixTable) {
        self.affixes = affixes;
    }

    pub fn set_rarity_weights(&mut self, weights: RarityWeights) {
        self.rarity_weights = weights;
    }

    pub fn set_stamping(&mut self, stamping: StampingConfig) {
        self.stamping = stamping;
    }

    /// Drop all content
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn get_table(&self, name: &str) -> Option<&LootTable> {
        self.tables.get(name)
    }

    pub fn get_template(&self, id: &str) -> Option<&ItemTemplate> {
        self.templates.get(id)
    }

    pub fn get_tier(&self, name: &str) -> Option<&TierConfig> {
        self.tiers.get(name)
    }

    pub fn pools(&self) -> &ItemPools {
        &self.pools
    }

    pub fn affixes(&self) -> &AffixTable {
        &self.affixes
    }

    pub fn rarity_weights(&self) -> &RarityWeights {
        &self.rarity_weights
    }

    pub fn stamping(&self) -> &StampingConfig {
        &self.stamping
    }

    pub fn scaling(&self) -> &ScalingConfig {
        &self.scaling
    }

    /// Table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Tier names, sorted
    pub fn tier_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.tiers.is_empty()
    }

    fn report_dangling_references(&self) -> usize {
        let mut dangling = 0;
        for table in self.tables.values() {
            for id in table.template_references() {
                if !self.templates.contains_key(id) {
                    tracing::warn!(table = %table.name, template = %id, "unknown item template");
                    dangling += 1;
                }
            }
            for nested in table.nested_references() {
                if !self.tables.contains_key(nested) {
                    tracing::warn!(table = %table.name, nested = %nested, "unknown nested table");
                    dangling += 1;
                }
            }
        }
        for id in self.pools.all_templates() {
            if !self.templates.contains_key(id) {
                tracing::warn!(template = %id, "unknown template in item pools");
                dangling += 1;
            }
        }
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{LootDrop, RollCount};

    const CONTENT: &str = r#"
templates:
  iron_sword: { name: Iron Sword, slot: weapon }
  ghost: { id: wrong, name: Ghost }
tables:
  goblin:
    name: not_goblin
    guaranteed:
      - { type: item, template: iron_sword }
      - { type: item, template: missing }
    weighted:
      - { type: nested_table, table: nowhere }
"#;

    #[test]
    fn keys_override_inner_names() {
        let registry = TableRegistry::from_config(LootConfig::from_yaml(CONTENT).unwrap());
        assert_eq!(registry.get_table("goblin").unwrap().name, "goblin");
        assert_eq!(registry.get_template("ghost").unwrap().id, "ghost");
        assert!(registry.get_template("wrong").is_none());
    }

    #[test]
    fn counts_dangling_references() {
        let registry = TableRegistry::from_config(LootConfig::from_yaml(CONTENT).unwrap());
        assert_eq!(registry.report_dangling_references(), 2);
    }

    #[test]
    fn register_and_clear() {
        let mut registry = TableRegistry::new();
        assert!(registry.is_empty());
        registry.register_template("a", ItemTemplate::new("", "A"));
        registry.register_table(
            "t",
            LootTable::new("").with_weighted(vec![LootDrop::item("a")], RollCount::Fixed(2)),
        );
        assert_eq!(registry.table_names(), vec!["t"]);
        assert!(!registry.is_empty());

        registry.clear();
        assert!(registry.get_table("t").is_none());
        assert!(registry.get_template("a").is_none());
    }

    #[test]
    fn drop_validity_uses_registry() {
        let registry = TableRegistry::from_config(LootConfig::from_yaml(CONTENT).unwrap());
        assert!(LootDrop::item("iron_sword").is_valid(&registry));
        assert!(!LootDrop::item("missing").is_valid(&registry));
        assert!(LootDrop::nested("goblin").is_valid(&registry));
        assert!(!LootDrop::nested("nowhere").is_valid(&registry));
        assert!(LootDrop::nothing().is_valid(&registry));
    }
}
