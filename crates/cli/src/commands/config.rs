use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use supportflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let fields: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "SUPPORTFLOW_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "SUPPORTFLOW_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "SUPPORTFLOW_DATABASE_TIMEOUT_SECS",
        ),
        ("llm.base_url", config.llm.base_url.clone(), "SUPPORTFLOW_LLM_BASE_URL"),
        ("llm.model", config.llm.model.clone(), "SUPPORTFLOW_LLM_MODEL"),
        (
            "llm.embedding_model",
            config.llm.embedding_model().to_string(),
            "SUPPORTFLOW_LLM_EMBEDDING_MODEL",
        ),
        ("llm.api_key", api_key, "SUPPORTFLOW_LLM_API_KEY"),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), "SUPPORTFLOW_LLM_TIMEOUT_SECS"),
        ("llm.max_retries", config.llm.max_retries.to_string(), "SUPPORTFLOW_LLM_MAX_RETRIES"),
        (
            "llm.retry_delay_ms",
            config.llm.retry_delay_ms.to_string(),
            "SUPPORTFLOW_LLM_RETRY_DELAY_MS",
        ),
        ("llm.simulate", config.llm.simulate.to_string(), "SUPPORTFLOW_LLM_SIMULATE"),
        (
            "pipeline.max_concurrency",
            config.pipeline.max_concurrency.to_string(),
            "SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY",
        ),
        (
            "pipeline.conversation_deadline_secs",
            config.pipeline.conversation_deadline_secs.to_string(),
            "SUPPORTFLOW_PIPELINE_CONVERSATION_DEADLINE_SECS",
        ),
        (
            "pipeline.similar_limit",
            config.pipeline.similar_limit.to_string(),
            "SUPPORTFLOW_PIPELINE_SIMILAR_LIMIT",
        ),
        (
            "pipeline.knowledge_max_results",
            config.pipeline.knowledge_max_results.to_string(),
            "SUPPORTFLOW_PIPELINE_KNOWLEDGE_MAX_RESULTS",
        ),
        (
            "sentiment.customer_only",
            config.sentiment.customer_only.to_string(),
            "SUPPORTFLOW_SENTIMENT_CUSTOMER_ONLY",
        ),
        ("logging.level", config.logging.level.clone(), "SUPPORTFLOW_LOGGING_LEVEL"),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            "SUPPORTFLOW_LOGGING_FORMAT",
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        let source =
            field_source(key, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    CommandResult::raw(0, lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("supportflow.toml"), PathBuf::from("config/supportflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
