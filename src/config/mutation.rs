use super::traits::ConfigSection;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Lines kept clear of mutation at each end of the stream.
///
/// The defaults fit the modular-exponentiation seed: the prologue and loop
/// header (lines 0..=6) and the epilogue (`pop rbp; ret`) are never split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub head_margin: usize,
    pub tail_margin: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            head_margin: 7,
            tail_margin: 2,
        }
    }
}

impl ConfigSection for MutationConfig {
    fn section_name() -> &'static str {
        "mutation"
    }

    // Margins can only be checked against a concrete stream; see Mutator::insertion_range.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
