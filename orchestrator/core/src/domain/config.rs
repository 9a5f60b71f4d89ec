// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Runtime Configuration Manifest
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) holding every
// tunable of the runtime:
// - Memory tier capacities and consolidation ratio
// - Capability directory thresholds, reputation averaging, discovery mode
// - Decomposition threshold and proposal deadline
// - Market bid deadline and bidder gate
// - Liveness polling, stall detection, reassignment cap, cooldown
// - Inference timeout, durable storage backend, logging

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "hive/v1";
pub const KIND: &str = "HiveConfig";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfigManifest {
    /// API version (must be "hive/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HiveConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: HiveConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiveConfigSpec {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub decomposition: DecompositionConfig,

    #[serde(default)]
    pub market: MarketConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Working memory capacity W
    #[serde(default = "default_working_capacity")]
    pub working_capacity: usize,

    /// Episodic memory capacity E; exceeding it triggers consolidation
    #[serde(default = "default_episodic_capacity")]
    pub episodic_capacity: usize,

    /// Fraction of E kept after consolidation (0.5 keeps the latest E/2)
    #[serde(default = "default_retain_ratio")]
    pub retain_ratio: f64,

    /// Occurrences of a pattern in episodic memory before it is promoted
    #[serde(default = "default_pattern_min_occurrences")]
    pub pattern_min_occurrences: usize,

    /// Optional Handlebars template for prompt assembly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            working_capacity: default_working_capacity(),
            episodic_capacity: default_episodic_capacity(),
            retain_ratio: default_retain_ratio(),
            pattern_min_occurrences: default_pattern_min_occurrences(),
            prompt_template: None,
        }
    }
}

/// How far the directory lets reputation translate into autonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Every grant requires mediation.
    Mediated,
    /// Grants are capped at limited autonomy.
    Limited,
    /// Grants follow the reputation thresholds.
    #[default]
    Autonomous,
}

impl std::str::FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mediated" => Ok(DiscoveryMode::Mediated),
            "limited" => Ok(DiscoveryMode::Limited),
            "autonomous" => Ok(DiscoveryMode::Autonomous),
            other => Err(format!(
                "unknown discovery mode '{}'. Expected mediated, limited or autonomous",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Minimum (exclusive) match score for `find`
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// EMA smoothing factor for reputation updates
    #[serde(default = "default_reputation_alpha")]
    pub reputation_alpha: f64,

    /// Reputation of agents seen for the first time
    #[serde(default = "default_initial_reputation")]
    pub initial_reputation: f64,

    /// Reputation above which full autonomy is granted
    #[serde(default = "default_full_autonomy_threshold")]
    pub full_autonomy_threshold: f64,

    /// Reputation above which limited autonomy is granted
    #[serde(default = "default_limited_autonomy_threshold")]
    pub limited_autonomy_threshold: f64,

    #[serde(default)]
    pub discovery_mode: DiscoveryMode,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            reputation_alpha: default_reputation_alpha(),
            initial_reputation: default_initial_reputation(),
            full_autonomy_threshold: default_full_autonomy_threshold(),
            limited_autonomy_threshold: default_limited_autonomy_threshold(),
            discovery_mode: DiscoveryMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionConfig {
    /// Tasks below this complexity are never decomposed (τ)
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: f64,

    /// Deadline for each proposal; expiry counts as no proposal
    #[serde(default = "default_solicit_timeout", with = "humantime_serde")]
    pub proposal_timeout: Duration,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: default_complexity_threshold(),
            proposal_timeout: default_solicit_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Deadline for each bid; expiry counts as no bid
    #[serde(default = "default_solicit_timeout", with = "humantime_serde")]
    pub bid_timeout: Duration,

    /// Agents at or below this reputation are not asked to bid
    #[serde(default = "default_min_bidder_reputation")]
    pub min_bidder_reputation: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            bid_timeout: default_solicit_timeout(),
            min_bidder_reputation: default_min_bidder_reputation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Liveness polling interval per running sub-task
    #[serde(default = "default_liveness_interval", with = "humantime_serde")]
    pub liveness_interval: Duration,

    /// Deadline for one liveness check; expiry counts as a missed check
    #[serde(default = "default_solicit_timeout", with = "humantime_serde")]
    pub liveness_timeout: Duration,

    /// Consecutive missed checks that count as a stall
    #[serde(default = "default_missed_checks")]
    pub missed_checks: u32,

    /// Reassignments allowed per sub-task before permanent failure
    #[serde(default = "default_max_reassignments")]
    pub max_reassignments: u32,

    /// How long a stalled or failed agent is excluded from bidding
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    pub cooldown: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            liveness_interval: default_liveness_interval(),
            liveness_timeout: default_solicit_timeout(),
            missed_checks: default_missed_checks(),
            max_reassignments: default_max_reassignments(),
            cooldown: default_cooldown(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            timeout: default_inference_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    InMemory,
    Local {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_working_capacity() -> usize {
    10
}

fn default_episodic_capacity() -> usize {
    100
}

fn default_retain_ratio() -> f64 {
    0.5
}

fn default_pattern_min_occurrences() -> usize {
    2
}

fn default_match_threshold() -> f64 {
    0.7
}

fn default_reputation_alpha() -> f64 {
    0.1
}

fn default_initial_reputation() -> f64 {
    0.5
}

fn default_full_autonomy_threshold() -> f64 {
    0.8
}

fn default_limited_autonomy_threshold() -> f64 {
    0.6
}

fn default_complexity_threshold() -> f64 {
    0.3
}

fn default_solicit_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_min_bidder_reputation() -> f64 {
    0.5
}

fn default_liveness_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_missed_checks() -> u32 {
    3
}

fn default_max_reassignments() -> u32 {
    2
}

fn default_cooldown() -> Duration {
    Duration::from_secs(60)
}

fn default_inference_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HiveConfigManifest {
    fn default() -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "hive-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: HiveConfigSpec::default(),
        }
    }
}

impl HiveConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HIVE_CONFIG_PATH environment variable
    /// 2. ./hive-config.yaml (working directory)
    /// 3. ~/.hive/config.yaml (user home)
    /// 4. /etc/hive/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HIVE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hive-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hive").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/hive/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse.
        if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HIVE_DISCOVERY_MODE") {
            match val.parse::<DiscoveryMode>() {
                Ok(mode) => {
                    tracing::info!("Environment override: HIVE_DISCOVERY_MODE={:?}", mode);
                    self.spec.directory.discovery_mode = mode;
                }
                Err(e) => {
                    tracing::warn!("Invalid value for HIVE_DISCOVERY_MODE: {}. Ignoring.", e);
                }
            }
        }

        if let Ok(val) = std::env::var("HIVE_LOG_LEVEL") {
            tracing::info!("Environment override: HIVE_LOG_LEVEL={}", val);
            self.spec.logging.level = val;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        self.spec.validate()
    }
}

impl HiveConfigSpec {
    /// Range and consistency checks on every component section.
    pub fn validate(&self) -> anyhow::Result<()> {
        let memory = &self.memory;
        if memory.working_capacity == 0 || memory.episodic_capacity == 0 {
            anyhow::bail!("Memory capacities must be greater than zero");
        }
        if !(memory.retain_ratio > 0.0 && memory.retain_ratio <= 1.0) {
            anyhow::bail!(
                "memory.retain_ratio must be within (0, 1], got {}",
                memory.retain_ratio
            );
        }
        if memory.pattern_min_occurrences == 0 {
            anyhow::bail!("memory.pattern_min_occurrences must be at least 1");
        }

        let directory = &self.directory;
        if !(directory.reputation_alpha > 0.0 && directory.reputation_alpha <= 1.0) {
            anyhow::bail!(
                "directory.reputation_alpha must be within (0, 1], got {}",
                directory.reputation_alpha
            );
        }
        for (name, value) in [
            ("directory.match_threshold", directory.match_threshold),
            ("directory.initial_reputation", directory.initial_reputation),
            ("directory.full_autonomy_threshold", directory.full_autonomy_threshold),
            ("directory.limited_autonomy_threshold", directory.limited_autonomy_threshold),
            ("decomposition.complexity_threshold", self.decomposition.complexity_threshold),
            ("market.min_bidder_reputation", self.market.min_bidder_reputation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if directory.limited_autonomy_threshold > directory.full_autonomy_threshold {
            anyhow::bail!(
                "directory.limited_autonomy_threshold ({}) exceeds full_autonomy_threshold ({})",
                directory.limited_autonomy_threshold,
                directory.full_autonomy_threshold
            );
        }

        let execution = &self.execution;
        if execution.liveness_interval.is_zero() || execution.liveness_timeout.is_zero() {
            anyhow::bail!("Liveness interval and timeout must be non-zero");
        }
        if execution.missed_checks == 0 {
            anyhow::bail!("execution.missed_checks must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HiveConfigManifest::default();

        assert_eq!(config.spec.memory.working_capacity, 10);
        assert_eq!(config.spec.memory.episodic_capacity, 100);
        assert_eq!(config.spec.memory.retain_ratio, 0.5);
        assert_eq!(config.spec.directory.match_threshold, 0.7);
        assert_eq!(config.spec.directory.reputation_alpha, 0.1);
        assert_eq!(config.spec.decomposition.complexity_threshold, 0.3);
        assert_eq!(config.spec.execution.liveness_interval, Duration::from_secs(5));
        assert_eq!(config.spec.execution.missed_checks, 3);
        assert_eq!(config.spec.execution.max_reassignments, 2);
        assert_eq!(config.spec.storage, StorageConfig::InMemory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_manifest() {
        let yaml = r#"
apiVersion: hive/v1
kind: HiveConfig
metadata:
  name: test-node
spec:
  memory:
    episodic_capacity: 40
    retain_ratio: 0.25
  directory:
    discovery_mode: limited
  execution:
    liveness_interval: 250ms
    cooldown: 2m
  storage:
    backend: local
    path: /var/lib/hive
"#;
        let config = HiveConfigManifest::from_yaml_str(yaml).unwrap();

        assert_eq!(config.metadata.name, "test-node");
        assert_eq!(config.spec.memory.episodic_capacity, 40);
        assert_eq!(config.spec.memory.retain_ratio, 0.25);
        assert_eq!(config.spec.memory.working_capacity, 10);
        assert_eq!(config.spec.directory.discovery_mode, DiscoveryMode::Limited);
        assert_eq!(config.spec.execution.liveness_interval, Duration::from_millis(250));
        assert_eq!(config.spec.execution.cooldown, Duration::from_secs(120));
        assert_eq!(
            config.spec.storage,
            StorageConfig::Local {
                path: PathBuf::from("/var/lib/hive")
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HiveConfigManifest::default();
        config.spec.memory.retain_ratio = 0.0;
        assert!(config.validate().is_err());

        let mut config = HiveConfigManifest::default();
        config.spec.directory.limited_autonomy_threshold = 0.9;
        assert!(config.validate().is_err());

        let mut config = HiveConfigManifest::default();
        config.kind = "NodeConfig".to_string();
        assert!(config.validate().is_err());

        let mut config = HiveConfigManifest::default();
        config.spec.execution.liveness_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut spec = HiveConfigSpec::default();
        spec.memory.retain_ratio = 1.5;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_discovery_mode_from_str() {
        assert_eq!("Mediated".parse::<DiscoveryMode>(), Ok(DiscoveryMode::Mediated));
        assert_eq!("autonomous".parse::<DiscoveryMode>(), Ok(DiscoveryMode::Autonomous));
        assert!("sometimes".parse::<DiscoveryMode>().is_err());
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive-config.yaml");
        let config = HiveConfigManifest::default();

        config.to_yaml_file(&path).unwrap();
        let loaded = HiveConfigManifest::load_or_default(Some(path)).unwrap();

        assert_eq!(loaded.spec.memory, config.spec.memory);
        assert_eq!(loaded.spec.execution, config.spec.execution);
    }
}
