use crate::config::{ConfigSection, EvolutionConfig};
use crate::engines::evaluation::{Executor, Fault, FitnessOracle};
use crate::engines::generation::{
    chromosome::Chromosome,
    operators::{MutationRecord, Mutator},
};
use crate::error::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize, population_size: usize);
    fn on_survivor(&mut self, generation: usize, chromosome: usize, trial: usize, mutation: &MutationRecord);
    fn on_generation_complete(&mut self, generation: usize, survivors: usize, population_size: usize);
}

/// Outcome counts over every trial of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrialStats {
    pub trials: usize,
    pub fit: usize,
    pub wrong_value: usize,
    pub arithmetic_faults: usize,
    pub timeouts: usize,
    pub crashes: usize,
    pub other_faults: usize,
}

impl TrialStats {
    fn record(&mut self, outcome: &std::result::Result<u64, Fault>, fit: bool) {
        self.trials += 1;
        match outcome {
            Ok(_) if fit => self.fit += 1,
            Ok(_) => self.wrong_value += 1,
            Err(Fault::ArithmeticFault) => self.arithmetic_faults += 1,
            Err(Fault::Timeout(_)) => self.timeouts += 1,
            Err(Fault::Crashed { .. }) => self.crashes += 1,
            Err(_) => self.other_faults += 1,
        }
    }
}

#[derive(Debug)]
pub struct EvolutionOutcome {
    /// First chromosome of the final population
    pub best: Chromosome,
    pub population: Vec<Chromosome>,
    pub generations: usize,
    /// Lines in the seed program
    pub seed_len: usize,
    /// Genes carried by `best`
    pub inserted: usize,
    /// `best` executed once more after the last generation
    pub final_value: std::result::Result<u64, Fault>,
    pub stats: TrialStats,
}

pub struct EvolutionEngine<E: Executor, O: FitnessOracle> {
    config: EvolutionConfig,
    mutator: Mutator,
    executor: E,
    oracle: O,
    rng: StdRng,
    stats: TrialStats,
}

impl<E: Executor, O: FitnessOracle> EvolutionEngine<E, O> {
    pub fn new(config: EvolutionConfig, mutator: Mutator, executor: E, oracle: O) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            mutator,
            executor,
            oracle,
            rng,
            stats: TrialStats::default(),
        }
    }

    /// Run the evolution process starting from a single seed chromosome
    pub fn run<C: ProgressCallback>(
        &mut self,
        seed: Chromosome,
        mut callback: C,
    ) -> Result<EvolutionOutcome> {
        self.config.validate()?;

        let seed_len = seed.len();
        match self.executor.execute(&seed.to_bytes()) {
            Ok(value) if self.oracle.is_fit(value) => {
                log::info!("Seed of {} lines returns {} (fit)", seed_len, value)
            }
            Ok(value) => log::warn!("Seed returns {}, which the oracle rejects", value),
            Err(fault) => log::warn!("Seed does not run cleanly: {}", fault),
        }

        let mut population = vec![seed];

        for generation in 0..self.config.generations {
            callback.on_generation_start(generation, population.len());

            let survivors = self.evolve_generation(generation, &population, &mut callback)?;
            let survivor_count = survivors.len();

            // generations without survivors keep the previous population
            if !survivors.is_empty() {
                population = survivors;
            }

            callback.on_generation_complete(generation, survivor_count, population.len());
        }

        let best = population[0].clone();
        let final_value = self.executor.execute(&best.to_bytes());

        Ok(EvolutionOutcome {
            inserted: best.len() - seed_len,
            best,
            population,
            generations: self.config.generations,
            seed_len,
            final_value,
            stats: self.stats.clone(),
        })
    }

    /// Mutate every chromosome `mutations` times and collect the fit mutants.
    ///
    /// Trialing stops for the whole generation once `allowed_genes` survivors
    /// have been found.
    pub fn evolve_generation<C: ProgressCallback>(
        &mut self,
        generation: usize,
        population: &[Chromosome],
        callback: &mut C,
    ) -> Result<Vec<Chromosome>> {
        let mut survivors = Vec::new();

        'population: for (index, parent) in population.iter().enumerate() {
            for trial in 0..self.config.mutations {
                if survivors.len() >= self.config.allowed_genes {
                    break 'population;
                }

                let mut child = parent.clone();
                let mutation = self.mutator.mutate(&mut child, &mut self.rng)?;

                let outcome = self.executor.execute(&child.to_bytes());
                let fit = matches!(&outcome, Ok(value) if self.oracle.is_fit(*value));
                self.stats.record(&outcome, fit);

                match &outcome {
                    Ok(value) => log::debug!(
                        "gen {} chromosome {} trial {}: +[{}] at line {} -> {}",
                        generation, index, trial, mutation.gene, mutation.line, value
                    ),
                    Err(fault) => log::debug!(
                        "gen {} chromosome {} trial {}: +[{}] at line {} -> {}",
                        generation, index, trial, mutation.gene, mutation.line, fault
                    ),
                }

                if fit {
                    callback.on_survivor(generation, index, trial, &mutation);
                    survivors.push(child);
                }
            }
        }

        Ok(survivors)
    }

    pub fn stats(&self) -> &TrialStats {
        &self.stats
    }
}
