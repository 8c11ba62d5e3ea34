//! Error taxonomy for content loading and rolling

use thiserror::Error;

/// Everything that can go wrong while loading content or resolving a roll.
///
/// Roll-time variants never escape a roll: they are logged and the step that
/// hit them contributes nothing. Only content loading returns them.
#[derive(Debug, Error)]
pub enum LootError {
    #[error("loot table not found: {0}")]
    TableNotFound(String),

    #[error("no valid entries in {pool} pool of table {table}")]
    EmptyPool { table: String, pool: &'static str },

    #[error("item drop in table {table} has no usable template ({template:?})")]
    InvalidTemplate {
        table: String,
        template: Option<String>,
    },

    #[error("currency roll in table {table} resolved to {amount}")]
    ZeroAmount { table: String, amount: i64 },

    #[error("nested table {table} exceeds nesting limit ({limit})")]
    NestingTooDeep { table: String, limit: usize },

    #[error("unknown combat tier: {0}")]
    UnknownTier(String),

    #[error("failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML content: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON content: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LootError>;
