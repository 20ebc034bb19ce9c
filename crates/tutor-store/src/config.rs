//! `tutor.toml` and curriculum files.
//!
//! ```toml
//! [bkt]
//! p_init = 0.10
//! p_transit = 0.15
//! p_slip = 0.10
//! p_guess = 0.20
//! ```
//!
//! A missing file or section means defaults. Parameters are validated here,
//! at the boundary, so the tracer can stay total.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tutor_core::{BktParams, Curriculum};

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "tutor.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub bkt: BktParams,
}

impl TutorConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: TutorConfig =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        config
            .bkt
            .validate()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)?;
                tracing::info!("loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(StoreError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

pub fn parse_curriculum(content: &str) -> Result<Curriculum> {
    toml::from_str(content).map_err(|e| StoreError::InvalidData(format!("invalid curriculum: {e}")))
}

pub fn load_curriculum(path: &Path) -> Result<Curriculum> {
    let content = fs::read_to_string(path).map_err(|e| {
        StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_curriculum(&content)
}
