//! CLI entry point for rolling loot tables

use clap::{Args, Parser, Subcommand, ValueEnum};
use dice_loot_lib::{
    logging, run_and_aggregate, run_roll_with_rng, DropStats, LootResult, LootRoller,
    RollModifiers, RollRequest, SourceInfo, TableRegistry,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "dice-loot")]
#[command(version = "0.1")]
#[command(about = "Roll loot tables and measure drop rates", long_about = None)]
struct Cli {
    /// Path to the loot content file (YAML or JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll a named loot table
    Table {
        /// Table name
        name: String,

        /// Luck modifier (each point adds 1% bonus chance)
        #[arg(long, default_value = "0")]
        luck: f64,

        /// Magic find modifier (each point adds 1% bonus chance)
        #[arg(long, default_value = "0")]
        magic_find: f64,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Roll combat loot for an enemy tier
    Combat {
        /// Tier name
        tier: String,

        /// Enemy archetype for the archetype bonus pool
        #[arg(long)]
        archetype: Option<String>,

        /// Luck (raises the world legendary chance)
        #[arg(long, default_value = "0")]
        luck: f64,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Source level to stamp items at
    #[arg(long)]
    level: Option<u32>,

    /// Source region (1-6)
    #[arg(long)]
    region: Option<u8>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of rolls; more than one prints aggregated stats
    #[arg(short, long, default_value = "1")]
    num_rolls: usize,

    /// RNG seed (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use parallel processing
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,
}

impl From<&SourceArgs> for SourceInfo {
    fn from(args: &SourceArgs) -> Self {
        SourceInfo {
            level: args.level,
            region: args.region,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(logging::level_for_verbosity(cli.verbose));

    let registry = match TableRegistry::load(&cli.config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error loading loot content: {}", e);
            std::process::exit(1);
        }
    };
    let roller = LootRoller::new(&registry);

    let (request, run) = match &cli.command {
        Command::Table {
            name,
            luck,
            magic_find,
            source,
            run,
        } => {
            if registry.get_table(name).is_none() {
                eprintln!("Unknown table '{}'. Known tables: {}", name, registry.table_names().join(", "));
                std::process::exit(1);
            }
            let request = RollRequest::table(name.clone(), RollModifiers::new(*luck, *magic_find), source.into());
            (request, run)
        }
        Command::Combat {
            tier,
            archetype,
            luck,
            source,
            run,
        } => {
            if registry.get_tier(tier).is_none() {
                eprintln!("Unknown tier '{}'. Known tiers: {}", tier, registry.tier_names().join(", "));
                std::process::exit(1);
            }
            let request = RollRequest::combat(tier.clone(), archetype.clone(), *luck, source.into());
            (request, run)
        }
    };

    let seed = run.seed.unwrap_or_else(rand::random);
    let start = Instant::now();

    if run.num_rolls <= 1 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let results = run_roll_with_rng(&roller, &request, &mut rng);
        let elapsed = start.elapsed();
        print_results(&results, seed, &run.output);
        if run.timing {
            println!("Roll time: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
        }
        return;
    }

    let stats = run_and_aggregate(&roller, &request, run.num_rolls, run.parallel, seed);
    let elapsed = start.elapsed();
    print_stats(&stats, run, seed, elapsed.as_secs_f64());
}

fn print_results(results: &[LootResult], seed: u64, output: &OutputFormat) {
    match output {
        OutputFormat::Text => {
            println!("=== Loot (seed {}) ===", seed);
            if results.is_empty() {
                println!("(nothing)");
            }
            for result in results {
                match result {
                    LootResult::Item { item, quantity, source } => {
                        println!(
                            "{}x {} [{}] ilvl {} (req {}){} <- {}",
                            quantity,
                            item.name,
                            item.rarity,
                            item.item_level,
                            item.required_level,
                            item.region.map(|r| format!(" region {}", r)).unwrap_or_default(),
                            source
                        );
                        for affix in &item.affixes {
                            println!("    +{} {}", affix.value, affix.stat);
                        }
                    }
                    LootResult::Currency { currency, amount, source } => {
                        println!("{} {} <- {}", amount, currency, source);
                    }
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "seed": seed,
                "results": results,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("Failed to serialize results: {}", e),
            }
        }
    }
}

fn print_stats(stats: &DropStats, run: &RunArgs, seed: u64, elapsed: f64) {
    match run.output {
        OutputFormat::Text => {
            println!("=== Loot Simulation Results ===");
            println!("Rolls: {} (seed {})", stats.runs, seed);
            println!();
            println!("Avg Results per Roll: {:.2}", stats.avg_results);
            println!("Empty Rolls: {:.2}%", stats.empty_rate * 100.0);
            println!("Avg Items: {:.2}", stats.avg_items);
            println!("Avg Currency: {:.1}", stats.avg_currency);
            println!(
                "Item Level: {} - {} (avg {:.1})",
                stats.min_item_level, stats.max_item_level, stats.avg_item_level
            );
            println!();
            println!("--- Rarity ---");
            for (rarity, count) in &stats.rarity_counts {
                println!("{:<10} {:>8} ({:.2}%)", rarity.to_string(), count, stats.rarity_share(*rarity) * 100.0);
            }
            println!();
            println!("--- Drop Rates ---");
            let mut hits: Vec<_> = stats.template_hits.iter().collect();
            hits.sort_by(|a, b| b.1.cmp(a.1));
            for (id, _) in hits {
                println!("{:<24} {:.2}%", id, stats.hit_rate(id) * 100.0);
            }

            if run.timing {
                println!();
                println!("--- Performance ---");
                println!("Total time: {:.3}s", elapsed);
                println!("Per roll: {:.4}ms", elapsed * 1000.0 / stats.runs.max(1) as f64);
                println!("Rolls/sec: {:.0}", stats.runs as f64 / elapsed.max(f64::EPSILON));
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "rolls": stats.runs,
                "seed": seed,
                "parallel": run.parallel,
                "elapsed_seconds": elapsed,
                "stats": stats,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("Failed to serialize results: {}", e),
            }
        }
    }
}
