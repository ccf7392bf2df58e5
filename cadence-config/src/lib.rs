//! # Cadence Configuration System
//!
//! Hierarchical configuration for the scheduler, the loop driver and
//! telemetry.
//!
//! Hierarchy, lowest precedence first:
//! 1. Default values
//! 2. `config/cadence.yaml`
//! 3. `config/<CADENCE_ENV>.yaml`
//! 4. `CADENCE_*` environment variables (`__` separates nested keys)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod scheduler;
mod simulator;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use scheduler::SchedulerConfig;
pub use simulator::SimulatorConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/cadence.yaml";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct CadenceConfig {
    /// Deterministic scheduler parameters.
    #[serde(default)]
    #[validate(nested)]
    pub scheduler: SchedulerConfig,

    /// Fixed-step loop driver parameters.
    #[serde(default)]
    #[validate(nested)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl CadenceConfig {
    /// Load configuration from default files and environment.
    ///
    /// Missing files are skipped; the result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(CadenceConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("CADENCE_ENV").unwrap_or_else(|_| "development".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed("CADENCE_").split("__")))
    }

    /// Load configuration from a specific path, still honouring `CADENCE_*`
    /// environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::extract(
            Figment::from(Serialized::defaults(CadenceConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed("CADENCE_").split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
