//! Cluster/cost configuration loading (§6). Mirrors the teacher's
//! `Config::load` shape: a YAML file read once at startup, resolved to
//! an absolute path, parsed, and validated before anything else runs.

use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";

/// The nodes/weights/sizing inputs that feed `CostModel` (§6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CostConfig {
    #[serde(default = "default_env")]
    pub env: String,
    pub nodes: u32,
    /// MB.
    pub max_memory: u64,
    pub skew_intervals: u32,
    /// Bits; divided by 4 (nibbles) when used to size address-derived
    /// quantities.
    pub address_size: u32,
    /// LRU slots.
    pub window_size: u32,
    #[serde(default = "default_weight")]
    pub weight_network: f64,
    #[serde(default = "default_weight")]
    pub weight_disk: f64,
    #[serde(default = "default_weight")]
    pub weight_skew: f64,
    /// Bytes.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub preload_enabled: bool,
}

fn default_env() -> String {
    DEV.to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_page_size() -> u64 {
    4096
}

impl CostConfig {
    /// Loads and validates a cost config from a YAML file (§6).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let abs_path = path
            .canonicalize()
            .map_err(|e| AdvisorError::ConfigError(format!("resolve config path {path:?}: {e}")))?;
        let data = std::fs::read_to_string(&abs_path)
            .map_err(|e| AdvisorError::ConfigError(format!("read config {abs_path:?}: {e}")))?;
        let cfg: CostConfig = serde_yaml::from_str(&data)
            .map_err(|e| AdvisorError::ConfigError(format!("parse config {abs_path:?}: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects zero/negative weights or sizes, an all-zero weight
    /// vector, and `window_size == 0` (§7, ConfigError).
    pub fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(AdvisorError::ConfigError("nodes must be >= 1".to_string()));
        }
        if self.skew_intervals == 0 {
            return Err(AdvisorError::ConfigError("skew_intervals must be >= 1".to_string()));
        }
        if self.window_size == 0 {
            return Err(AdvisorError::ConfigError("window_size must be >= 1".to_string()));
        }
        for (name, w) in [
            ("weight_network", self.weight_network),
            ("weight_disk", self.weight_disk),
            ("weight_skew", self.weight_skew),
        ] {
            if w < 0.0 {
                return Err(AdvisorError::ConfigError(format!("{name} must be >= 0")));
            }
        }
        if self.weight_network <= 0.0 && self.weight_disk <= 0.0 && self.weight_skew <= 0.0 {
            return Err(AdvisorError::ConfigError("at least one weight must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn is_prod(&self) -> bool {
        self.env == PROD
    }

    /// `address_size` expressed in hex nibbles, used by the disk
    /// component's slot-size model.
    pub fn address_nibbles(&self) -> u32 {
        self.address_size / 4
    }
}
