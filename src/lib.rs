//! Dice Loot - weighted loot rolling and item generation
//!
//! Tables of guaranteed, weighted and bonus drops are loaded once into a
//! [`TableRegistry`] and rolled by a [`LootRoller`] against a caller-owned RNG.

pub mod affix;
pub mod combat;
pub mod config;
pub mod error;
pub mod item;
pub mod logging;
pub mod registry;
pub mod roller;
pub mod simulation;
pub mod stats;
pub mod table;

#[cfg(feature = "python")]
mod python;

pub use affix::*;
pub use combat::*;
pub use config::*;
pub use error::{LootError, Result};
pub use item::*;
pub use registry::*;
pub use roller::*;
pub use simulation::*;
pub use stats::*;
pub use table::*;
