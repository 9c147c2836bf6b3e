use anyhow::{Context, Result};
use clap::Parser;
use codevolve::config::ConfigManager;
use codevolve::data::HexConnector;
use codevolve::engines::evaluation::{ExpectedValue, Sandbox};
use codevolve::engines::generation::{
    Chromosome, ConsoleProgressCallback, EvolutionEngine, Mutator, RunReport,
};
use codevolve::isa::InstructionTable;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "codevolve")]
#[command(about = "Evolve x86-64 machine code by gene insertion under a sandboxed fitness test")]
struct Cli {
    /// Number of generations
    generations: Option<usize>,
    /// Mutation trials per chromosome per generation
    mutations: Option<usize>,
    /// Survivors kept per generation
    allowed_genes: Option<usize>,

    /// Seed program as text hex
    #[arg(long, default_value = "code.hex")]
    seed_file: PathBuf,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-trial watchdog deadline
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Fixed RNG seed for a reproducible run
    #[arg(long)]
    rng_seed: Option<u64>,
    /// Write the evolved chromosome here as hex
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write a JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let started_at = chrono::Utc::now().to_rfc3339();

    let manager = ConfigManager::new();
    match &cli.config {
        Some(path) => manager.load_from_file(path)?,
        None => manager.load_from_env()?,
    }
    manager.update(|config| {
        if let Some(generations) = cli.generations {
            config.evolution.generations = generations;
        }
        if let Some(mutations) = cli.mutations {
            config.evolution.mutations = mutations;
        }
        if let Some(allowed_genes) = cli.allowed_genes {
            config.evolution.allowed_genes = allowed_genes;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            config.sandbox.timeout_ms = timeout_ms;
        }
        if cli.rng_seed.is_some() {
            config.evolution.rng_seed = cli.rng_seed;
        }
    })?;
    let config = manager.get()?;

    let table = Arc::new(InstructionTable::new());
    let code = HexConnector::load(&cli.seed_file)?;
    let seed = Chromosome::decode(&code, &table)
        .with_context(|| format!("Failed to decode {}", cli.seed_file.display()))?;

    log::info!("Initial chromosome ({} lines):\n{}", seed.len(), seed);

    let sandbox = Sandbox::new(&config.sandbox);
    log::info!(
        "Sandbox: timeout {:?}, page {} bytes, args {:?}",
        sandbox.timeout(),
        sandbox.page_size(),
        config.sandbox.args
    );

    let mutator = Mutator::new(table, config.mutation.clone());
    let mut engine = EvolutionEngine::new(
        config.evolution.clone(),
        mutator,
        sandbox,
        ExpectedValue(config.fitness.expected),
    );

    let outcome = engine.run(seed, ConsoleProgressCallback)?;

    log::info!("Output code ({} lines):\n{}", outcome.best.len(), outcome.best);
    log::info!("Inserted instructions: {}", outcome.inserted);
    match &outcome.final_value {
        Ok(value) => log::info!("Execution test: {}", value),
        Err(fault) => log::warn!("Execution test failed: {}", fault),
    }
    log::info!("Trials: {:?}", outcome.stats);

    if let Some(path) = &cli.output {
        HexConnector::save(path, &outcome.best)?;
        log::info!("Saved evolved chromosome to {}", path.display());
    }

    if let Some(path) = &cli.report {
        RunReport::new(&outcome, started_at, config.evolution.rng_seed).write_json(path)?;
        log::info!("Saved run report to {}", path.display());
    }

    Ok(())
}
