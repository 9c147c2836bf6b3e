use super::traits::ConfigSection;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Return value a fit chromosome must produce
    pub expected: u64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        // 2^12 mod 10
        Self { expected: 6 }
    }
}

impl ConfigSection for FitnessConfig {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
