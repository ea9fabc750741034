use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::synthesis::{
    CorrectionPolicy, DispatchSettings, FuzzyCorrector, GenerationConstraints, Generator,
    PredicateValidator, QueryDispatcher, DEFAULT_MAX_QUERY_LEN, MAX_FRAGMENT_LEN,
};

/// Prefix for environment overrides; nested keys use `__`, e.g.
/// `NLQ_GENERATOR__MODEL`.
pub const ENV_PREFIX: &str = "NLQ_";

/// Fallback environment variable for the Gemini API key.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub generator: GeneratorConfig,
    pub synthesis: SynthesisConfig,
    pub logging: LoggingConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Language model used to draft predicates and filter sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `google` or `ollama`.
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Gemini API root, when not the public endpoint.
    pub base_url: Option<String>,
    /// Ollama host.
    pub host: String,
    /// Upper bound on a single generator call.
    pub timeout_secs: u64,
    pub sql_temperature: f32,
    pub sql_max_tokens: u32,
    pub filter_temperature: f32,
    pub filter_max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            base_url: None,
            host: "http://localhost:11434".to_string(),
            timeout_secs: 20,
            sql_temperature: 0.2,
            sql_max_tokens: 300,
            filter_temperature: 0.3,
            filter_max_tokens: 150,
        }
    }
}

/// Synthesis bounds and correction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Longest natural-language query accepted, in characters.
    pub max_query_len: usize,
    /// Longest generated fragment the validator accepts, in characters.
    pub max_fragment_len: usize,
    pub correction: CorrectionPolicy,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_query_len: DEFAULT_MAX_QUERY_LEN,
            max_fragment_len: MAX_FRAGMENT_LEN,
            correction: CorrectionPolicy::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Also write JSON logs to a daily file under the data directory.
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_file: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `~/.config/nlq-catalog/config.toml`, then `NLQ_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            log::info!("Loading config from {}", path.display());
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
        }
        Self::load_from(&path)
    }

    /// Load with an explicit config file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        if config.generator.api_key.as_deref().map_or(true, str::is_empty) {
            config.generator.api_key = std::env::var(GEMINI_API_KEY_VAR)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(config)
    }

    /// Effective configuration as TOML with the API key masked.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.generator.api_key.is_some() {
            shown.generator.api_key = Some("********".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("nlq-catalog"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Path of the catalog database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(crate::database::DATABASE_FILE)
    }

    /// Per-path generation constraints and the query bound.
    pub fn dispatch_settings(&self) -> DispatchSettings {
        let timeout = Duration::from_secs(self.generator.timeout_secs);
        DispatchSettings {
            sql: GenerationConstraints {
                temperature: self.generator.sql_temperature,
                max_tokens: self.generator.sql_max_tokens,
                ..GenerationConstraints::sql_fragment()
            }
            .with_timeout(timeout),
            filters: GenerationConstraints {
                temperature: self.generator.filter_temperature,
                max_tokens: self.generator.filter_max_tokens,
                ..GenerationConstraints::filter_set()
            }
            .with_timeout(timeout),
            max_query_len: self.synthesis.max_query_len,
        }
    }

    /// Dispatcher wired with the configured bounds and correction policy.
    pub fn build_dispatcher(&self, generator: Arc<dyn Generator>) -> QueryDispatcher {
        QueryDispatcher::new(generator)
            .with_validator(PredicateValidator::with_max_len(self.synthesis.max_fragment_len))
            .with_corrector(FuzzyCorrector::new(self.synthesis.correction))
            .with_settings(self.dispatch_settings())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("nlq-catalog").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
