use super::traits::ConfigSection;
use crate::error::{CodevolveError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Generations to run; zero only evaluates the seed
    pub generations: usize,
    /// Independent mutation trials per chromosome per generation
    pub mutations: usize,
    /// Cap on survivors kept per generation
    pub allowed_genes: usize,
    /// Fixed RNG seed for reproducible runs
    pub rng_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            generations: 100,
            mutations: 5,
            allowed_genes: 1,
            rng_seed: None,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.mutations == 0 {
            return Err(CodevolveError::Usage(
                "Mutations per chromosome must be a positive integer".to_string()
            ));
        }
        if self.allowed_genes == 0 {
            return Err(CodevolveError::Usage(
                "Allowed genes must be a positive integer".to_string()
            ));
        }
        Ok(())
    }
}
