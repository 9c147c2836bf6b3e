use super::{
    evolution::EvolutionConfig,
    fitness::FitnessConfig,
    mutation::MutationConfig,
    sandbox::SandboxConfig,
    traits::ConfigSection,
};
use crate::error::{CodevolveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Environment variables override file values, e.g. `CODEVOLVE__SANDBOX__TIMEOUT_MS=500`
pub const ENV_PREFIX: &str = "CODEVOLVE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub mutation: MutationConfig,
    pub sandbox: SandboxConfig,
    pub fitness: FitnessConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        check(&self.evolution)?;
        check(&self.mutation)?;
        check(&self.sandbox)?;
        check(&self.fitness)?;
        Ok(())
    }
}

fn check<S: ConfigSection>(section: &S) -> Result<()> {
    section.validate().map_err(|e| {
        log::error!("Invalid [{}] section: {}", S::section_name(), e);
        e
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML file layered with environment overrides
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CodevolveError::Configuration(format!(
                "Config file {} not found",
                path.display()
            )));
        }

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(Self::environment())
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CodevolveError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    /// Defaults layered with environment overrides only
    pub fn load_from_env(&self) -> Result<()> {
        let config: AppConfig = config::Config::builder()
            .add_source(Self::environment())
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CodevolveError::Configuration(format!("Failed to read environment: {}", e)))?;

        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| CodevolveError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| CodevolveError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| CodevolveError::Configuration("Config lock poisoned".to_string()))
    }

    /// Apply `f` and keep the result only if it validates
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>> {
        self.config
            .write()
            .map_err(|_| CodevolveError::Configuration("Config lock poisoned".to_string()))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
