use super::traits::ConfigSection;
use crate::error::{CodevolveError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Wall-clock budget of one trial
    pub timeout_ms: u64,
    /// Arguments passed in rdi, rsi, rdx
    pub args: [u64; 3],
    /// Executable region size; the system page size when unset
    pub page_size: Option<usize>,
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            args: [2, 12, 10],
            page_size: None,
        }
    }
}

impl ConfigSection for SandboxConfig {
    fn section_name() -> &'static str {
        "sandbox"
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(CodevolveError::Configuration(
                "Sandbox timeout must be positive".to_string()
            ));
        }
        if let Some(size) = self.page_size {
            if size == 0 || !size.is_power_of_two() {
                return Err(CodevolveError::Configuration(format!(
                    "Page size {} must be a positive power of two",
                    size
                )));
            }
        }
        Ok(())
    }
}
