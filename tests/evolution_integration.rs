use codevolve::config::{AppConfig, EvolutionConfig, MutationConfig};
use codevolve::data::HexConnector;
use codevolve::engines::evaluation::{ExpectedValue, Executor, Sandbox};
use codevolve::engines::generation::{
    Chromosome, EvolutionEngine, MutationRecord, Mutator, ProgressCallback,
};
use codevolve::isa::InstructionTable;
use std::path::Path;
use std::sync::Arc;

/// Records what the engine reported
#[derive(Default)]
struct TestProgressCallback {
    started: usize,
    survivors: usize,
    completed: Vec<(usize, usize)>,
}

impl ProgressCallback for TestProgressCallback {
    fn on_generation_start(&mut self, _generation: usize, _population_size: usize) {
        self.started += 1;
    }

    fn on_survivor(&mut self, _generation: usize, _chromosome: usize, _trial: usize, _mutation: &MutationRecord) {
        self.survivors += 1;
    }

    fn on_generation_complete(&mut self, _generation: usize, survivors: usize, population_size: usize) {
        self.completed.push((survivors, population_size));
    }
}

impl ProgressCallback for &mut TestProgressCallback {
    fn on_generation_start(&mut self, generation: usize, population_size: usize) {
        (**self).on_generation_start(generation, population_size)
    }

    fn on_survivor(&mut self, generation: usize, chromosome: usize, trial: usize, mutation: &MutationRecord) {
        (**self).on_survivor(generation, chromosome, trial, mutation)
    }

    fn on_generation_complete(&mut self, generation: usize, survivors: usize, population_size: usize) {
        (**self).on_generation_complete(generation, survivors, population_size)
    }
}

fn load_seed(table: &InstructionTable) -> Chromosome {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("code.hex");
    let code = HexConnector::load(path).unwrap();
    Chromosome::decode(&code, table).unwrap()
}

fn engine(evolution: EvolutionConfig) -> EvolutionEngine<Sandbox, ExpectedValue> {
    let mut config = AppConfig::default();
    // mutants that break the loop counter spin until killed
    config.sandbox.timeout_ms = 500;
    let mutator = Mutator::new(Arc::new(InstructionTable::new()), MutationConfig::default());
    EvolutionEngine::new(
        evolution,
        mutator,
        Sandbox::new(&config.sandbox),
        ExpectedValue(config.fitness.expected),
    )
}

#[test]
fn test_seed_computes_modexp() {
    let table = InstructionTable::new();
    let seed = load_seed(&table);
    assert_eq!(seed.len(), 14);

    let sandbox = Sandbox::new(&AppConfig::default().sandbox);
    // 2^12 mod 10
    assert_eq!(sandbox.execute(&seed.to_bytes()).unwrap(), 6);
}

#[test]
fn test_zero_generations_reports_seed() {
    let table = InstructionTable::new();
    let seed = load_seed(&table);

    let mut progress = TestProgressCallback::default();
    let outcome = engine(EvolutionConfig {
        generations: 0,
        rng_seed: Some(1),
        ..Default::default()
    })
    .run(seed.clone(), &mut progress)
    .unwrap();

    assert_eq!(outcome.best, seed);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.final_value.unwrap(), 6);
    assert_eq!(progress.started, 0);
}

#[test]
fn test_short_run_keeps_only_fit_mutants() {
    let table = InstructionTable::new();
    let seed = load_seed(&table);
    let sandbox = Sandbox::new(&AppConfig::default().sandbox);

    let mut progress = TestProgressCallback::default();
    let outcome = engine(EvolutionConfig {
        generations: 4,
        mutations: 6,
        allowed_genes: 2,
        rng_seed: Some(7),
    })
    .run(seed.clone(), &mut progress)
    .unwrap();

    assert_eq!(progress.started, 4);
    assert_eq!(progress.completed.len(), 4);
    assert_eq!(outcome.stats.fit, progress.survivors);
    assert_eq!(outcome.final_value.unwrap(), 6);
    assert_eq!(outcome.inserted, outcome.best.len() - seed.len());
    assert!(outcome.population.len() <= 2);

    for (survivors, population_size) in &progress.completed {
        assert!(*survivors <= 2);
        assert!(*population_size >= 1);
    }

    // every member of the final population is itself fit
    for chromosome in &outcome.population {
        assert_eq!(sandbox.execute(&chromosome.to_bytes()).unwrap(), 6);
        assert_eq!(chromosome.len(), outcome.best.len());
    }
}
