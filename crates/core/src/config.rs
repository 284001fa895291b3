use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub nlu: NluConfig,
    pub search: SearchConfig,
    pub dialogue: DialogueTuning,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NluConfig {
    pub provider: NluProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub api_key: Option<SecretString>,
    pub products_index: String,
    pub orders_index: String,
    pub candidate_count: usize,
    pub timeout_secs: u64,
}

/// Dialogue-policy thresholds. These values mirror the shipped product
/// behaviour but are deliberately configuration, not constants: none of them
/// is derived from a documented policy.
#[derive(Clone, Debug)]
pub struct DialogueTuning {
    /// Turn count at which a human-agent handoff is offered once per session.
    pub escalation_offer_turn: u32,
    /// Half-width of the "around <price>" band, as a fraction of the target.
    pub around_band: f64,
    /// Minimum relevance score for a semantic match to be considered.
    pub relevance_floor: f64,
    /// Minimum relevance score for a comparison-search match.
    pub comparison_match_floor: f64,
    /// Result-set cap for product recommendations.
    pub max_results: usize,
    /// Fixed conversion between the display currency and the search
    /// backend's native currency.
    pub yen_to_inr_rate: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NluProvider {
    #[serde(alias = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub nlu_provider: Option<NluProvider>,
    pub nlu_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopmate.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            nlu: NluConfig {
                provider: NluProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            search: SearchConfig {
                api_key: None,
                products_index: "store-products".to_string(),
                orders_index: "store-orders".to_string(),
                candidate_count: 50,
                timeout_secs: 30,
            },
            dialogue: DialogueTuning::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for DialogueTuning {
    fn default() -> Self {
        Self {
            escalation_offer_turn: 4,
            around_band: 0.20,
            relevance_floor: 0.1,
            comparison_match_floor: 0.3,
            max_results: 6,
            yen_to_inr_rate: 0.60,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for NluProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported nlu provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopmate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(nlu) = patch.nlu {
            if let Some(provider) = nlu.provider {
                self.nlu.provider = provider;
            }
            if let Some(nlu_api_key_value) = nlu.api_key {
                self.nlu.api_key = Some(secret_value(nlu_api_key_value));
            }
            if let Some(base_url) = nlu.base_url {
                self.nlu.base_url = Some(base_url);
            }
            if let Some(model) = nlu.model {
                self.nlu.model = model;
            }
            if let Some(timeout_secs) = nlu.timeout_secs {
                self.nlu.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = nlu.max_retries {
                self.nlu.max_retries = max_retries;
            }
        }

        if let Some(search) = patch.search {
            if let Some(search_api_key_value) = search.api_key {
                self.search.api_key = Some(secret_value(search_api_key_value));
            }
            if let Some(products_index) = search.products_index {
                self.search.products_index = products_index;
            }
            if let Some(orders_index) = search.orders_index {
                self.search.orders_index = orders_index;
            }
            if let Some(candidate_count) = search.candidate_count {
                self.search.candidate_count = candidate_count;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(dialogue) = patch.dialogue {
            if let Some(escalation_offer_turn) = dialogue.escalation_offer_turn {
                self.dialogue.escalation_offer_turn = escalation_offer_turn;
            }
            if let Some(around_band) = dialogue.around_band {
                self.dialogue.around_band = around_band;
            }
            if let Some(relevance_floor) = dialogue.relevance_floor {
                self.dialogue.relevance_floor = relevance_floor;
            }
            if let Some(comparison_match_floor) = dialogue.comparison_match_floor {
                self.dialogue.comparison_match_floor = comparison_match_floor;
            }
            if let Some(max_results) = dialogue.max_results {
                self.dialogue.max_results = max_results;
            }
            if let Some(yen_to_inr_rate) = dialogue.yen_to_inr_rate {
                self.dialogue.yen_to_inr_rate = yen_to_inr_rate;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPMATE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHOPMATE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHOPMATE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPMATE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPMATE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPMATE_NLU_PROVIDER") {
            self.nlu.provider = value.parse()?;
        }
        if let Some(value) = read_env("SHOPMATE_NLU_API_KEY") {
            self.nlu.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPMATE_NLU_BASE_URL") {
            self.nlu.base_url = Some(value);
        }
        if let Some(value) = read_env("SHOPMATE_NLU_MODEL") {
            self.nlu.model = value;
        }
        if let Some(value) = read_env("SHOPMATE_NLU_TIMEOUT_SECS") {
            self.nlu.timeout_secs = parse_u64("SHOPMATE_NLU_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SHOPMATE_NLU_MAX_RETRIES") {
            self.nlu.max_retries = parse_u32("SHOPMATE_NLU_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("SHOPMATE_SEARCH_API_KEY") {
            self.search.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPMATE_SEARCH_PRODUCTS_INDEX") {
            self.search.products_index = value;
        }
        if let Some(value) = read_env("SHOPMATE_SEARCH_ORDERS_INDEX") {
            self.search.orders_index = value;
        }
        if let Some(value) = read_env("SHOPMATE_SEARCH_CANDIDATE_COUNT") {
            self.search.candidate_count =
                parse_u32("SHOPMATE_SEARCH_CANDIDATE_COUNT", &value)? as usize;
        }
        if let Some(value) = read_env("SHOPMATE_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("SHOPMATE_SEARCH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPMATE_DIALOGUE_ESCALATION_OFFER_TURN") {
            self.dialogue.escalation_offer_turn =
                parse_u32("SHOPMATE_DIALOGUE_ESCALATION_OFFER_TURN", &value)?;
        }
        if let Some(value) = read_env("SHOPMATE_DIALOGUE_AROUND_BAND") {
            self.dialogue.around_band = parse_f64("SHOPMATE_DIALOGUE_AROUND_BAND", &value)?;
        }
        if let Some(value) = read_env("SHOPMATE_DIALOGUE_RELEVANCE_FLOOR") {
            self.dialogue.relevance_floor =
                parse_f64("SHOPMATE_DIALOGUE_RELEVANCE_FLOOR", &value)?;
        }
        if let Some(value) = read_env("SHOPMATE_DIALOGUE_MAX_RESULTS") {
            self.dialogue.max_results =
                parse_u32("SHOPMATE_DIALOGUE_MAX_RESULTS", &value)? as usize;
        }
        if let Some(value) = read_env("SHOPMATE_DIALOGUE_YEN_TO_INR_RATE") {
            self.dialogue.yen_to_inr_rate =
                parse_f64("SHOPMATE_DIALOGUE_YEN_TO_INR_RATE", &value)?;
        }

        let log_level =
            read_env("SHOPMATE_LOGGING_LEVEL").or_else(|| read_env("SHOPMATE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPMATE_LOGGING_FORMAT").or_else(|| read_env("SHOPMATE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(nlu_provider) = overrides.nlu_provider {
            self.nlu.provider = nlu_provider;
        }
        if let Some(nlu_model) = overrides.nlu_model {
            self.nlu.model = nlu_model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_nlu(&self.nlu)?;
        validate_search(&self.search)?;
        validate_dialogue(&self.dialogue)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopmate.toml"), PathBuf::from("config/shopmate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_nlu(nlu: &NluConfig) -> Result<(), ConfigError> {
    if nlu.timeout_secs == 0 || nlu.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "nlu.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match nlu.provider {
        NluProvider::OpenAi | NluProvider::Anthropic => {
            let missing = nlu
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "nlu.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        NluProvider::Ollama => {
            let missing =
                nlu.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "nlu.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.products_index.trim().is_empty() || search.orders_index.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search.products_index and search.orders_index must be non-empty".to_string(),
        ));
    }

    if search.candidate_count == 0 {
        return Err(ConfigError::Validation(
            "search.candidate_count must be greater than zero".to_string(),
        ));
    }

    if search.timeout_secs == 0 || search.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "search.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_dialogue(dialogue: &DialogueTuning) -> Result<(), ConfigError> {
    if dialogue.escalation_offer_turn == 0 {
        return Err(ConfigError::Validation(
            "dialogue.escalation_offer_turn must be greater than zero".to_string(),
        ));
    }

    if !(dialogue.around_band > 0.0 && dialogue.around_band < 1.0) {
        return Err(ConfigError::Validation(
            "dialogue.around_band must be strictly between 0 and 1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&dialogue.relevance_floor)
        || !(0.0..=1.0).contains(&dialogue.comparison_match_floor)
    {
        return Err(ConfigError::Validation(
            "dialogue relevance floors must be within 0..=1".to_string(),
        ));
    }

    if dialogue.max_results == 0 {
        return Err(ConfigError::Validation(
            "dialogue.max_results must be greater than zero".to_string(),
        ));
    }

    if dialogue.yen_to_inr_rate <= 0.0 {
        return Err(ConfigError::Validation(
            "dialogue.yen_to_inr_rate must be positive".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    nlu: Option<NluPatch>,
    search: Option<SearchPatch>,
    dialogue: Option<DialoguePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NluPatch {
    provider: Option<NluProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    api_key: Option<String>,
    products_index: Option<String>,
    orders_index: Option<String>,
    candidate_count: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DialoguePatch {
    escalation_offer_turn: Option<u32>,
    around_band: Option<f64>,
    relevance_floor: Option<f64>,
    comparison_match_floor: Option<f64>,
    max_results: Option<usize>,
    yen_to_inr_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
