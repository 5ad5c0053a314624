//! Serializable simulation configuration.
//!
//! A `RunConfig` is read from TOML. Every field has a default, so an empty file
//! (or no file at all) reproduces the classic setup: 11-member rosters covering
//! all four roles, 20 000 unique rosters, ±5% tolerance.
//!
//! ```toml
//! label = "final"
//!
//! [data]
//! expected_candidates = 22
//!
//! [sampling]
//! roster_size = 11
//! required_roles = ["Batsman", "Bowler", "WK", "Allrounder"]
//! target_collection_size = 20000
//! max_total_attempts = 1000000
//! max_attempts_per_sample = 1000
//! seed = 42
//!
//! [evaluation]
//! tolerance = 0.05
//!
//! [replicates]
//! count = 8
//! threads = 4
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use rosterlab_core::{Role, SamplerConfig, DEFAULT_TOLERANCE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Prefix of the artifact directory.
    pub label: String,
    pub data: DataSection,
    pub sampling: SamplingSection,
    pub evaluation: EvaluationSection,
    pub replicates: ReplicateSection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            label: "simulation".into(),
            data: DataSection::default(),
            sampling: SamplingSection::default(),
            evaluation: EvaluationSection::default(),
            replicates: ReplicateSection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Reject candidate files whose row count differs.
    pub expected_candidates: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSection {
    pub roster_size: usize,
    pub required_roles: BTreeSet<Role>,
    pub target_collection_size: usize,
    pub max_total_attempts: usize,
    pub max_attempts_per_sample: usize,
    pub seed: u64,
}

impl Default for SamplingSection {
    fn default() -> Self {
        let sampler = SamplerConfig::default();
        Self {
            roster_size: sampler.roster_size,
            required_roles: sampler.required_roles,
            target_collection_size: sampler.target_collection_size,
            max_total_attempts: sampler.max_total_attempts,
            max_attempts_per_sample: sampler.max_attempts_per_sample,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSection {
    pub tolerance: f64,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateSection {
    pub count: usize,
    /// Worker threads; `1` runs replicates sequentially.
    pub threads: usize,
}

impl Default for ReplicateSection {
    fn default() -> Self {
        Self {
            count: 8,
            threads: 1,
        }
    }
}

impl RunConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&s)
    }

    /// Checks that do not depend on the candidate pool. Pool-dependent checks
    /// (roster size versus pool size) happen in the sampler.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.trim().is_empty() {
            return Err(ConfigError::Invalid("label must not be empty".into()));
        }
        let tol = self.evaluation.tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "evaluation.tolerance must be finite and >= 0, got {tol}"
            )));
        }
        if self.sampling.roster_size == 0 {
            return Err(ConfigError::Invalid("sampling.roster_size must be > 0".into()));
        }
        if self.sampling.target_collection_size == 0 {
            return Err(ConfigError::Invalid(
                "sampling.target_collection_size must be > 0".into(),
            ));
        }
        if self.sampling.max_attempts_per_sample == 0 {
            return Err(ConfigError::Invalid(
                "sampling.max_attempts_per_sample must be > 0".into(),
            ));
        }
        if self.replicates.count == 0 {
            return Err(ConfigError::Invalid("replicates.count must be > 0".into()));
        }
        if self.replicates.threads == 0 {
            return Err(ConfigError::Invalid("replicates.threads must be > 0".into()));
        }
        Ok(())
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            roster_size: self.sampling.roster_size,
            required_roles: self.sampling.required_roles.clone(),
            target_collection_size: self.sampling.target_collection_size,
            max_total_attempts: self.sampling.max_total_attempts,
            max_attempts_per_sample: self.sampling.max_attempts_per_sample,
        }
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs share the hash; it is recorded in the
    /// manifest next to the dataset hash.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
