//! Configuration loading, validation, and management for recall.
//!
//! Loads configuration from `~/.recall/config.toml` with environment
//! variable overrides. Validates all settings at load time so the pipeline
//! never starts with an out-of-range threshold or an empty routing policy.

use recall_core::classification::LayerPolicy;
use recall_core::layer::MemoryLayer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.recall/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Emit per-stage timing at info level
    #[serde(default)]
    pub debug: bool,

    /// Query classification backend and intent policy
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Fan-out, timeouts and caching
    #[serde(default)]
    pub router: RouterConfig,

    /// Scoring, deduplication and token budget
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Multi-hop result combination
    #[serde(default)]
    pub combiner: CombinerConfig,

    /// Reference layer adapters
    #[serde(default)]
    pub layers: LayersConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

// ── Classifier ────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// "rules" (local keyword backend) or "llm" (provider-backed)
    #[serde(default = "default_classifier_backend")]
    pub backend: String,

    /// Provider name for the llm backend (e.g. "openai", "ollama")
    #[serde(default = "default_classifier_provider")]
    pub provider: String,

    #[serde(default = "default_classifier_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub temperature: f32,

    /// Intent → weighted layers table
    #[serde(default)]
    pub policy: LayerPolicy,
}

fn default_classifier_backend() -> String {
    "rules".into()
}
fn default_classifier_provider() -> String {
    "ollama".into()
}
fn default_classifier_model() -> String {
    "llama3.2".into()
}
fn default_classifier_timeout_ms() -> u64 {
    5000
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: default_classifier_backend(),
            provider: default_classifier_provider(),
            model: default_classifier_model(),
            api_url: None,
            api_key: None,
            timeout_ms: default_classifier_timeout_ms(),
            temperature: 0.0,
            policy: LayerPolicy::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("backend", &self.backend)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_ms", &self.timeout_ms)
            .field("temperature", &self.temperature)
            .field("policy", &self.policy)
            .finish()
    }
}

// ── Router ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Budget for a single layer query
    #[serde(default = "default_layer_timeout_ms")]
    pub layer_timeout_ms: u64,

    /// Per-layer overrides keyed by layer name ("vector = 200")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layer_timeouts: BTreeMap<String, u64>,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached routing results
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_layer_timeout_ms() -> u64 {
    50
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_capacity() -> u64 {
    1024
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            layer_timeout_ms: default_layer_timeout_ms(),
            layer_timeouts: BTreeMap::new(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl RouterConfig {
    /// The effective timeout for `layer`.
    pub fn timeout_for(&self, layer: MemoryLayer) -> Duration {
        let ms = self
            .layer_timeouts
            .get(layer.as_str())
            .copied()
            .unwrap_or(self.layer_timeout_ms);
        Duration::from_millis(ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ── Fusion ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Token budget for the fused context
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Items scoring below this are dropped
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// How strongly to spread the top of the list across layers (0 = off)
    #[serde(default = "default_diversity_weight")]
    pub diversity_weight: f32,

    /// Pairwise similarity at or above which two items are duplicates
    #[serde(default = "default_dedup_threshold")]
    pub deduplication_threshold: f32,
}

fn default_max_tokens() -> usize {
    10_000
}
fn default_min_score() -> f32 {
    0.3
}
fn default_diversity_weight() -> f32 {
    0.2
}
fn default_dedup_threshold() -> f32 {
    0.85
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_score: default_min_score(),
            diversity_weight: default_diversity_weight(),
            deduplication_threshold: default_dedup_threshold(),
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("fusion.max_tokens must be > 0".into()));
        }
        self.validate_weights()
    }

    /// Range checks on the score knobs only. Per-request overrides go
    /// through this, since a caller may ask for a zero token budget.
    pub fn validate_weights(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("fusion.min_score", self.min_score),
            ("fusion.diversity_weight", self.diversity_weight),
            ("fusion.deduplication_threshold", self.deduplication_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ── Combiner ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinerConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_true")]
    pub include_separators: bool,
}

fn default_max_results() -> usize {
    20
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            include_separators: true,
        }
    }
}

// ── Layers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayersConfig {
    /// Directory holding `<layer>.jsonl` files. Defaults to `~/.recall/layers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Cap on items a reference adapter returns per query
    #[serde(default = "default_max_results_per_layer")]
    pub max_results_per_layer: usize,
}

fn default_max_results_per_layer() -> usize {
    50
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            max_results_per_layer: default_max_results_per_layer(),
        }
    }
}

impl LayersConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("layers"))
    }
}

// ── Loading ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from the default path (~/.recall/config.toml).
    ///
    /// Environment overrides:
    /// - `RECALL_API_KEY` (then `OPENAI_API_KEY`) for the classifier provider
    /// - `RECALL_CLASSIFIER` for the backend kind
    /// - `RECALL_MODEL` for the classifier model
    /// - `RECALL_DATA_DIR` for the layer data directory
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.classifier.api_key.is_none() {
            self.classifier.api_key = std::env::var("RECALL_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(backend) = std::env::var("RECALL_CLASSIFIER") {
            self.classifier.backend = backend;
        }
        if let Ok(model) = std::env::var("RECALL_MODEL") {
            self.classifier.model = model;
        }
        if let Ok(dir) = std::env::var("RECALL_DATA_DIR") {
            self.layers.data_dir = Some(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".recall")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.classifier.backend.as_str() {
            "rules" | "llm" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "classifier.backend must be \"rules\" or \"llm\", got \"{other}\""
                )));
            }
        }
        if self.classifier.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.timeout_ms must be > 0".into(),
            ));
        }
        self.classifier
            .policy
            .validate()
            .map_err(ConfigError::ValidationError)?;

        if self.router.layer_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "router.layer_timeout_ms must be > 0".into(),
            ));
        }
        for (name, ms) in &self.router.layer_timeouts {
            name.parse::<MemoryLayer>()
                .map_err(|e| ConfigError::ValidationError(format!("router.layer_timeouts: {e}")))?;
            if *ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "router.layer_timeouts.{name} must be > 0"
                )));
            }
        }
        if self.router.cache_enabled && self.router.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "router.cache_capacity must be > 0 when caching is enabled".into(),
            ));
        }

        self.fusion.validate()?;

        if self.combiner.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "combiner.max_results must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.router.layer_timeout_ms, 50);
        assert_eq!(config.router.cache_ttl_secs, 300);
        assert_eq!(config.fusion.max_tokens, 10_000);
        assert_eq!(config.combiner.max_results, 20);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.fusion, config.fusion);
        assert_eq!(parsed.classifier.policy, config.classifier.policy);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let config = AppConfig {
            fusion: FusionConfig {
                deduplication_threshold: 1.5,
                ..FusionConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.classifier.backend = "oracle".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn per_layer_timeout_override() {
        let toml_str = r#"
[router]
layer_timeout_ms = 40

[router.layer_timeouts]
vector = 120
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.router.timeout_for(MemoryLayer::Vector), Duration::from_millis(120));
        assert_eq!(config.router.timeout_for(MemoryLayer::Session), Duration::from_millis(40));
    }

    #[test]
    fn unknown_layer_in_timeouts_rejected() {
        let mut config = AppConfig::default();
        config.router.layer_timeouts.insert("filesystem".into(), 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_override_parses() {
        let toml_str = r#"
[[classifier.policy.user]]
layer = "user"
weight = 1.0

[[classifier.policy.user]]
layer = "session"
weight = 0.4
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.classifier.policy.user.layers(),
            vec![MemoryLayer::User, MemoryLayer::Session]
        );
        // Untouched intents keep their defaults
        assert_eq!(config.classifier.policy.historical, LayerPolicy::default().historical);
    }

    #[test]
    fn empty_policy_route_rejected() {
        let toml_str = r#"
[classifier.policy]
user = []
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.classifier.backend, "rules");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug = true\n\n[fusion]\nmax_tokens = 512").unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.fusion.max_tokens, 512);
        assert_eq!(config.fusion.min_score, 0.3);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fusion\nmax_tokens = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.classifier.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("layer_timeout_ms = 50"));
        assert!(toml_str.contains("deduplication_threshold"));
    }
}
