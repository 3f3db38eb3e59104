use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{DEFAULT_CONFIG_PATH, DEFAULT_MAX_KNOWN_CITIES, DEFAULT_REFERENCE_PATH};
use crate::error::{Result, ValidatorError};
use crate::pipeline::processing::quality_gate::HardRuleConfig;
use crate::pipeline::processing::reference::CollisionPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reference: ReferenceConfig,
    pub rules: HardRuleConfig,
    pub llm: LlmConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Path to the codciu reference table
    pub path: PathBuf,
    pub collision_policy: CollisionPolicy,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REFERENCE_PATH),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    /// OpenAI-compatible API root, e.g. http://localhost:11434/v1
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
    /// Cap on the known-city list sent for arbitration
    pub max_known_cities: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout_seconds: 30,
            max_known_cities: DEFAULT_MAX_KNOWN_CITIES,
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Addresses validated in parallel
    pub concurrency: usize,
    pub address_column: String,
    pub city_column: String,
    pub postcode_column: String,
    /// Log progress every N rows
    pub progress_every: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            address_column: "address".to_string(),
            city_column: "city".to_string(),
            postcode_column: "zip".to_string(),
            progress_every: 100,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path).map_err(|e| {
            ValidatorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.concurrency == 0 {
            return Err(ValidatorError::Config("batch.concurrency must be at least 1".to_string()));
        }
        if self.llm.max_known_cities == 0 || self.llm.max_known_cities > DEFAULT_MAX_KNOWN_CITIES {
            return Err(ValidatorError::Config(format!(
                "llm.max_known_cities must be between 1 and {}",
                DEFAULT_MAX_KNOWN_CITIES
            )));
        }
        if self.llm.enabled && self.llm.base_url.trim().is_empty() {
            return Err(ValidatorError::Config(
                "llm.base_url is required when llm.enabled".to_string(),
            ));
        }
        Ok(())
    }
}
