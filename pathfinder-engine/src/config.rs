//! Configuration for the path engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use pathfinder_graph::MAX_PATH_HOPS;

use crate::error::{PathfinderError, Result};
use crate::path::PathType;
use crate::scoring::ScoringWeights;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Discovery configuration
    pub discovery: DiscoveryConfig,
    /// Scoring weight table
    pub scoring: ScoringWeights,
    /// Ranking configuration
    pub ranking: RankingConfig,
}

impl PathfinderConfig {
    /// Load config from YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| PathfinderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PathfinderError::Config(e.to_string()))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.discovery.validate()?;
        self.scoring.validate()?;
        self.ranking.validate()
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Deadline for the whole discoverer fan-out (ms)
    pub timeout_ms: u64,
    /// Maximum path length in hops (at most 4)
    pub max_hops: usize,
    /// Cap on the number of source-network members used as connectors
    pub max_network_size: usize,
    /// Path types to discover
    pub enabled_types: Vec<PathType>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_hops: MAX_PATH_HOPS,
            max_network_size: 500,
            enabled_types: PathType::ALL.to_vec(),
        }
    }
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_enabled(&self, path_type: PathType) -> bool {
        self.enabled_types.contains(&path_type)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(PathfinderError::Config(
                "discovery.timeout_ms must be positive".into(),
            ));
        }
        if self.max_hops == 0 || self.max_hops > MAX_PATH_HOPS {
            return Err(PathfinderError::Config(format!(
                "discovery.max_hops must be between 1 and {}",
                MAX_PATH_HOPS
            )));
        }
        Ok(())
    }
}

/// Ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Page size when the caller gives none
    pub default_page_size: usize,
    /// Largest page a caller may request
    pub max_page_size: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl RankingConfig {
    fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 || self.default_page_size == 0 {
            return Err(PathfinderError::Config("page sizes must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(PathfinderError::Config(
                "ranking.default_page_size exceeds ranking.max_page_size".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PathfinderConfig::default();
        assert_eq!(config.discovery.max_hops, 4);
        assert_eq!(config.discovery.enabled_types.len(), 5);
        assert_eq!(config.ranking.default_page_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = PathfinderConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = PathfinderConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.scoring.version, config.scoring.version);
        assert_eq!(parsed.discovery.timeout_ms, 5_000);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
discovery:
  timeout_ms: 250
  enabled_types: [direct, org_direct]
"#;
        let config = PathfinderConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.discovery.timeout_ms, 250);
        assert!(config.discovery.is_enabled(PathType::OrgDirect));
        assert!(!config.discovery.is_enabled(PathType::ChainAffinity));
        assert_eq!(config.ranking.max_page_size, 100);
    }

    #[test]
    fn test_hop_bound_rejected() {
        let yaml = "discovery:\n  max_hops: 6\n";
        let err = PathfinderConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, PathfinderError::Config(_)));
    }
}
