use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::boc::SerializeOptions;
use crate::error::{IoResultExt, Result};

/// tool configuration stored as toml
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// defaults used when writing a bag of cells
    #[serde(default)]
    pub serialize: SerializeOptions,
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }
}
