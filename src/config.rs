//! JSON configuration (ambient stack).
//!
//! Parsed with `serde`/`serde_json`; every field defaults so a config file
//! only needs to mention what it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration, one section per subsystem.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub flow_manager: FlowManagerConfig,
    pub klut_mapping: KLutMappingConfig,
    pub rewrite: RewriteSectionConfig,
}

/// `flow_manager` section: which passes `compress`/`compress2` run, and
/// whether to SAT-check function preservation after every step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowManagerConfig {
    pub use_balance: bool,
    pub use_rewrite: bool,
    pub use_refactor: bool,
    /// Equivalence-check every step against its input (expensive; for debugging).
    pub debug: bool,
    /// Unused upper bound on optimization passes, accepted for parity with
    /// the original implementation.
    pub iterations: usize,
    pub verbose: bool,
    pub very_verbose: bool,
}

impl Default for FlowManagerConfig {
    fn default() -> FlowManagerConfig {
        FlowManagerConfig {
            use_balance: true,
            use_rewrite: true,
            use_refactor: true,
            debug: false,
            iterations: 1,
            verbose: false,
            very_verbose: false,
        }
    }
}

/// `klut_mapping` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KLutMappingConfig {
    pub k: usize,
    pub cut_limit: usize,
    pub area_flow_passes: usize,
    pub area_passes: usize,
}

impl Default for KLutMappingConfig {
    fn default() -> KLutMappingConfig {
        KLutMappingConfig {
            k: 6,
            cut_limit: 8,
            area_flow_passes: 2,
            area_passes: 2,
        }
    }
}

/// `rewrite` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteSectionConfig {
    pub cut_size: usize,
    pub cut_limit: usize,
    /// Minimum cut size at which truth-table minimization ("min-base") kicks in.
    pub min_candidate_cut_size: usize,
    pub use_zero_gain: bool,
    pub preserve_depth: bool,
}

impl Default for RewriteSectionConfig {
    fn default() -> RewriteSectionConfig {
        RewriteSectionConfig {
            cut_size: 4,
            cut_limit: 8,
            min_candidate_cut_size: 3,
            use_zero_gain: false,
            preserve_depth: true,
        }
    }
}

/// Error loading or parsing a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid config JSON: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load a config from a JSON file, or fall back to `Config::default()`
    /// if `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            None => Ok(Config::default()),
            Some(p) => {
                let text = fs::read_to_string(p).map_err(ConfigError::Io)?;
                serde_json::from_str(&text).map_err(ConfigError::Parse)
            }
        }
    }
}

impl From<&KLutMappingConfig> for crate::map::MapConfig {
    fn from(c: &KLutMappingConfig) -> crate::map::MapConfig {
        crate::map::MapConfig {
            k: c.k,
            cut_limit: c.cut_limit,
            area_flow_passes: c.area_flow_passes,
            area_passes: c.area_passes,
        }
    }
}

impl From<&RewriteSectionConfig> for crate::rewrite::RewriteConfig {
    fn from(c: &RewriteSectionConfig) -> crate::rewrite::RewriteConfig {
        crate::rewrite::RewriteConfig {
            cut_limit: c.cut_limit,
            use_zero_gain: c.use_zero_gain,
            preserve_depth: c.preserve_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_flow_manager_defaults() {
        let config = Config::default();
        assert!(config.flow_manager.use_balance);
        assert!(config.flow_manager.use_rewrite);
        assert_eq!(config.klut_mapping.k, 6);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"flow_manager": {"use_balance": false}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(!config.flow_manager.use_balance);
        assert!(config.flow_manager.use_rewrite);
        assert_eq!(config.klut_mapping.k, 6);
    }
}
