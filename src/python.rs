//! Python bindings for the loot roller using PyO3

use crate::config::LootConfig;
use crate::registry::TableRegistry;
use crate::roller::{LootRoller, RollModifiers, SourceInfo};
use crate::simulation::{run_and_aggregate, run_roll_with_rng, RollRequest};
use pyo3::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn registry_from_json(content_json: &str) -> PyResult<TableRegistry> {
    let config = LootConfig::from_json(content_json)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Invalid loot content: {}", e)))?;
    Ok(TableRegistry::from_config(config))
}

fn roll_once(registry: &TableRegistry, request: &RollRequest, seed: Option<u64>) -> PyResult<String> {
    let roller = LootRoller::new(registry);
    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let results = run_roll_with_rng(&roller, request, &mut rng);

    serde_json::to_string(&results)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("Failed to serialize results: {}", e)))
}

/// Roll a loot table once; returns the results as JSON
#[pyfunction]
#[pyo3(signature = (content_json, table, level=None, region=None, luck=0.0, magic_find=0.0, seed=None))]
#[allow(clippy::too_many_arguments)]
fn roll_table(
    py: Python<'_>,
    content_json: &str,
    table: &str,
    level: Option<u32>,
    region: Option<u8>,
    luck: f64,
    magic_find: f64,
    seed: Option<u64>,
) -> PyResult<String> {
    let registry = registry_from_json(content_json)?;
    let request = RollRequest::table(table, RollModifiers::new(luck, magic_find), SourceInfo { level, region });

    py.allow_threads(|| roll_once(&registry, &request, seed))
}

/// Roll combat loot for a tier once; returns the results as JSON
#[pyfunction]
#[pyo3(signature = (content_json, tier, archetype=None, luck=0.0, level=None, region=None, seed=None))]
#[allow(clippy::too_many_arguments)]
fn roll_combat(
    py: Python<'_>,
    content_json: &str,
    tier: &str,
    archetype: Option<String>,
    luck: f64,
    level: Option<u32>,
    region: Option<u8>,
    seed: Option<u64>,
) -> PyResult<String> {
    let registry = registry_from_json(content_json)?;
    let request = RollRequest::combat(tier, archetype, luck, SourceInfo { level, region });

    py.allow_threads(|| roll_once(&registry, &request, seed))
}

/// Roll a request (JSON) many times against a content file; returns DropStats as JSON
#[pyfunction]
#[pyo3(signature = (content_path, request_json, num_rolls, parallel=false, seed=0))]
fn simulate_table(
    py: Python<'_>,
    content_path: &str,
    request_json: &str,
    num_rolls: usize,
    parallel: bool,
    seed: u64,
) -> PyResult<String> {
    let registry = TableRegistry::load(content_path)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyIOError, _>(format!("Failed to load content: {}", e)))?;
    let request: RollRequest = serde_json::from_str(request_json)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Invalid request JSON: {}", e)))?;

    // Release GIL during computation
    let stats = py.allow_threads(|| {
        let roller = LootRoller::new(&registry);
        run_and_aggregate(&roller, &request, num_rolls, parallel, seed)
    });

    serde_json::to_string(&stats)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("Failed to serialize results: {}", e)))
}

/// Get number of threads being used for parallel simulation
#[pyfunction]
fn get_thread_count() -> PyResult<usize> {
    Ok(rayon::current_num_threads())
}

/// Get number of available CPU cores
#[pyfunction]
fn get_available_cores() -> PyResult<usize> {
    Ok(num_cpus::get())
}

/// Python module definition
#[pymodule]
fn dice_loot_lib(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(roll_table, m)?)?;
    m.add_function(wrap_pyfunction!(roll_combat, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_table, m)?)?;
    m.add_function(wrap_pyfunction!(get_thread_count, m)?)?;
    m.add_function(wrap_pyfunction!(get_available_cores, m)?)?;
    Ok(())
}
