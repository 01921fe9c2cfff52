//! Configuration.

use crate::error::Result;
use crate::headless::HeadlessConfig;
use crate::layout::Tolerances;
use crate::settle::SettlePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Crate configuration, usually loaded from a TOML file. Every field has a default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Retry schedule for asynchronous native effects.
    #[serde(default)]
    pub settle: SettlePolicy,

    /// Chrome tolerances for viewport negotiation.
    #[serde(default)]
    pub tolerances: Tolerances,

    #[serde(default)]
    pub headless: HeadlessConfig,
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Config> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        let config = Config::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
