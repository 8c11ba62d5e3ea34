//! Batch rolling for drop-rate balancing

use crate::affix::AffixInitializer;
use crate::roller::{LootResult, LootRoller, RollModifiers, SourceInfo};
use crate::stats::DropStats;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

/// What to roll on every iteration of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollRequest {
    Table {
        name: String,
        #[serde(default)]
        modifiers: RollModifiers,
        #[serde(default)]
        source: SourceInfo,
    },
    Combat {
        tier: String,
        #[serde(default)]
        archetype: Option<String>,
        #[serde(default)]
        luck: f64,
        #[serde(default)]
        source: SourceInfo,
    },
}

impl RollRequest {
    pub fn table(name: impl Into<String>, modifiers: RollModifiers, source: SourceInfo) -> Self {
        RollRequest::Table {
            name: name.into(),
            modifiers,
            source,
        }
    }

    pub fn combat(
        tier: impl Into<String>,
        archetype: Option<String>,
        luck: f64,
        source: SourceInfo,
    ) -> Self {
        RollRequest::Combat {
            tier: tier.into(),
            archetype,
            luck,
            source,
        }
    }
}

/// Run one request with a caller-provided RNG
pub fn run_roll_with_rng<A, R>(roller: &LootRoller<'_, A>, request: &RollRequest, rng: &mut R) -> Vec<LootResult>
where
    A: AffixInitializer,
    R: Rng + ?Sized,
{
    match request {
        RollRequest::Table {
            name,
            modifiers,
            source,
        } => roller.roll(name, modifiers, *source, rng),
        RollRequest::Combat {
            tier,
            archetype,
            luck,
            source,
        } => roller.roll_from_combat(tier, archetype.as_deref(), *luck, *source, rng),
    }
}

/// Roll number `index` of a batch. Each roll gets its own generator so the
/// outcome does not depend on which thread ran it.
fn run_indexed<A: AffixInitializer>(
    roller: &LootRoller<'_, A>,
    request: &RollRequest,
    seed: u64,
    index: usize,
) -> Vec<LootResult> {
    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(index as u64));
    run_roll_with_rng(roller, request, &mut rng)
}

/// Run `count` rolls on a rayon pool sized to the machine
pub fn run_rolls_parallel<A>(
    roller: &LootRoller<'_, A>,
    request: &RollRequest,
    count: usize,
    seed: u64,
) -> Vec<Vec<LootResult>>
where
    A: AffixInitializer + Sync,
{
    let threads = num_cpus::get().max(1);
    let work = || -> Vec<Vec<LootResult>> {
        let chunk_size = (count / threads).max(1);
        (0..count)
            .into_par_iter()
            .with_min_len(chunk_size.min(100))
            .map(|i| run_indexed(roller, request, seed, i))
            .collect()
    };

    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(work),
        Err(err) => {
            tracing::warn!(error = %err, "falling back to global rayon pool");
            work()
        }
    }
}

/// Run `count` rolls on the calling thread
pub fn run_rolls_sequential<A: AffixInitializer>(
    roller: &LootRoller<'_, A>,
    request: &RollRequest,
    count: usize,
    seed: u64,
) -> Vec<Vec<LootResult>> {
    (0..count)
        .map(|i| run_indexed(roller, request, seed, i))
        .collect()
}

/// Run rolls and return aggregated stats
pub fn run_and_aggregate<A>(
    roller: &LootRoller<'_, A>,
    request: &RollRequest,
    count: usize,
    parallel: bool,
    seed: u64,
) -> DropStats
where
    A: AffixInitializer + Sync,
{
    let rolls = if parallel {
        run_rolls_parallel(roller, request, count, seed)
    } else {
        run_rolls_sequential(roller, request, count, seed)
    };

    DropStats::from_rolls(&rolls)
}
