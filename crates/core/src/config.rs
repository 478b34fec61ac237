use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub sentiment: SentimentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub simulate: bool,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub max_concurrency: usize,
    pub conversation_deadline_secs: u64,
    pub similar_limit: usize,
    pub knowledge_max_results: usize,
}

#[derive(Clone, Debug)]
pub struct SentimentConfig {
    pub customer_only: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_simulate: Option<bool>,
    pub max_concurrency: Option<usize>,
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
                url: "sqlite://supportflow.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
                embedding_model: None,
                api_key: None,
                timeout_secs: 60,
                max_retries: 3,
                retry_delay_ms: 1000,
                simulate: false,
            },
            pipeline: PipelineConfig {
                max_concurrency: 2,
                conversation_deadline_secs: 600,
                similar_limit: 3,
                knowledge_max_results: 5,
            },
            sentiment: SentimentConfig { customer_only: false },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Model used for embedding requests; falls back to the completion model.
    pub fn embedding_model(&self) -> &str {
        self.embedding_model.as_deref().unwrap_or(&self.model)
    }
}

impl PipelineConfig {
    pub fn conversation_deadline(&self) -> Duration {
        Duration::from_secs(self.conversation_deadline_secs)
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("supportflow.toml"));
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

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(embedding_model) = llm.embedding_model {
                self.llm.embedding_model = Some(embedding_model);
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
            if let Some(retry_delay_ms) = llm.retry_delay_ms {
                self.llm.retry_delay_ms = retry_delay_ms;
            }
            if let Some(simulate) = llm.simulate {
                self.llm.simulate = simulate;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(max_concurrency) = pipeline.max_concurrency {
                self.pipeline.max_concurrency = max_concurrency;
            }
            if let Some(deadline) = pipeline.conversation_deadline_secs {
                self.pipeline.conversation_deadline_secs = deadline;
            }
            if let Some(similar_limit) = pipeline.similar_limit {
                self.pipeline.similar_limit = similar_limit;
            }
            if let Some(knowledge_max_results) = pipeline.knowledge_max_results {
                self.pipeline.knowledge_max_results = knowledge_max_results;
            }
        }

        if let Some(sentiment) = patch.sentiment {
            if let Some(customer_only) = sentiment.customer_only {
                self.sentiment.customer_only = customer_only;
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
        if let Some(value) = read_env("SUPPORTFLOW_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SUPPORTFLOW_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SUPPORTFLOW_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SUPPORTFLOW_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SUPPORTFLOW_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = Some(value);
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SUPPORTFLOW_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("SUPPORTFLOW_LLM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_RETRY_DELAY_MS") {
            self.llm.retry_delay_ms = parse_u64("SUPPORTFLOW_LLM_RETRY_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_LLM_SIMULATE") {
            self.llm.simulate = parse_bool("SUPPORTFLOW_LLM_SIMULATE", &value)?;
        }

        if let Some(value) = read_env("SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY") {
            self.pipeline.max_concurrency =
                parse_usize("SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_PIPELINE_CONVERSATION_DEADLINE_SECS") {
            self.pipeline.conversation_deadline_secs =
                parse_u64("SUPPORTFLOW_PIPELINE_CONVERSATION_DEADLINE_SECS", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_PIPELINE_SIMILAR_LIMIT") {
            self.pipeline.similar_limit =
                parse_usize("SUPPORTFLOW_PIPELINE_SIMILAR_LIMIT", &value)?;
        }
        if let Some(value) = read_env("SUPPORTFLOW_PIPELINE_KNOWLEDGE_MAX_RESULTS") {
            self.pipeline.knowledge_max_results =
                parse_usize("SUPPORTFLOW_PIPELINE_KNOWLEDGE_MAX_RESULTS", &value)?;
        }

        if let Some(value) = read_env("SUPPORTFLOW_SENTIMENT_CUSTOMER_ONLY") {
            self.sentiment.customer_only =
                parse_bool("SUPPORTFLOW_SENTIMENT_CUSTOMER_ONLY", &value)?;
        }

        let log_level =
            read_env("SUPPORTFLOW_LOGGING_LEVEL").or_else(|| read_env("SUPPORTFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SUPPORTFLOW_LOGGING_FORMAT").or_else(|| read_env("SUPPORTFLOW_LOG_FORMAT"));
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
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(simulate) = overrides.llm_simulate {
            self.llm.simulate = simulate;
        }
        if let Some(max_concurrency) = overrides.max_concurrency {
            self.pipeline.max_concurrency = max_concurrency;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("supportflow.toml"), PathBuf::from("config/supportflow.toml")]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.simulate {
        return Ok(());
    }

    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https:// (or enable llm.simulate)"
                .to_string(),
        ));
    }

    if let Some(api_key) = &llm.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.api_key is set but empty; remove it or provide a value".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.max_concurrency == 0 || pipeline.max_concurrency > 64 {
        return Err(ConfigError::Validation(
            "pipeline.max_concurrency must be in range 1..=64".to_string(),
        ));
    }

    if pipeline.conversation_deadline_secs == 0 {
        return Err(ConfigError::Validation(
            "pipeline.conversation_deadline_secs must be greater than zero".to_string(),
        ));
    }

    if pipeline.similar_limit == 0 {
        return Err(ConfigError::Validation(
            "pipeline.similar_limit must be greater than zero".to_string(),
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

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    pipeline: Option<PipelinePatch>,
    sentiment: Option<SentimentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    simulate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    max_concurrency: Option<usize>,
    conversation_deadline_secs: Option<u64>,
    similar_limit: Option<usize>,
    knowledge_max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SentimentPatch {
    customer_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_and_point_at_local_ollama() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.base_url == "http://localhost:11434", "default base url is ollama")?;
        ensure(!config.llm.simulate, "simulate mode is opt-in")?;
        ensure(config.llm.embedding_model() == "llama3", "embedding model falls back to model")?;
        ensure(config.pipeline.similar_limit == 3, "three similar conversations by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SUPPORTFLOW_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("supportflow.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_SUPPORTFLOW_API_KEY}"
model = "mistral"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string());
            ensure(
                api_key.as_deref() == Some("key-from-env"),
                "api key should be loaded from environment",
            )?;
            ensure(config.llm.model == "mistral", "model should come from the file")?;
            Ok(())
        })();

        clear_vars(&["TEST_SUPPORTFLOW_API_KEY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("supportflow.toml");
        fs::write(&path, "[llm]\napi_key = \"${SUPPORTFLOW_TEST_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var }) => ensure(
                var == "SUPPORTFLOW_TEST_UNSET_VAR",
                "error should name the missing variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected interpolation failure".to_string()),
        }
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SUPPORTFLOW_LOG_LEVEL", "warn");
        env::set_var("SUPPORTFLOW_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SUPPORTFLOW_LOG_LEVEL", "SUPPORTFLOW_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SUPPORTFLOW_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SUPPORTFLOW_LLM_MODEL", "model-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("supportflow.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[llm]
model = "model-from-file"
simulate = true

[pipeline]
max_concurrency = 4

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.llm.model == "model-from-env", "env model should win over file")?;
            ensure(config.llm.simulate, "simulate flag should be read from file")?;
            ensure(config.pipeline.max_concurrency == 4, "concurrency should be read from file")?;
            Ok(())
        })();

        clear_vars(&["SUPPORTFLOW_DATABASE_URL", "SUPPORTFLOW_LLM_MODEL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("pipeline.max_concurrency")
            );
            ensure(has_message, "validation failure should mention pipeline.max_concurrency")
        })();

        clear_vars(&["SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SUPPORTFLOW_LLM_TIMEOUT_SECS", "soon");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "SUPPORTFLOW_LLM_TIMEOUT_SECS", "error should name the env key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected env override failure".to_string()),
        };

        clear_vars(&["SUPPORTFLOW_LLM_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn non_http_base_url_is_allowed_only_in_simulate_mode() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SUPPORTFLOW_LLM_BASE_URL", "localhost:11434");

        let result = (|| -> Result<(), String> {
            let rejected = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(rejected, Err(ConfigError::Validation(ref message)) if message.contains("llm.base_url")),
                "bare host should be rejected for live backend",
            )?;

            let accepted = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides { llm_simulate: Some(true), ..ConfigOverrides::default() },
                ..LoadOptions::default()
            });
            ensure(accepted.is_ok(), "simulate mode does not contact the backend")
        })();

        clear_vars(&["SUPPORTFLOW_LLM_BASE_URL"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SUPPORTFLOW_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars(&["SUPPORTFLOW_LLM_API_KEY"]);
        result
    }
}
