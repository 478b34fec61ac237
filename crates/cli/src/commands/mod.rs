pub mod batch;
pub mod config;
pub mod doctor;
pub mod history;
pub mod migrate;
pub mod process;
pub mod seed;
pub mod show;

use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Runtime;

use supportflow_agent::{client_from_config, Orchestrator, OrchestratorSettings, StageSet};
use supportflow_core::config::{AppConfig, LoadOptions};
use supportflow_core::knowledge::{KnowledgeBase, DEFAULT_HELP_CENTER_URL};
use supportflow_db::{connect_from_config, migrations, DbPool, SqlRecordStore};

use crate::logging::init_logging;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Raw output that is not wrapped in an outcome object.
    pub fn raw(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// `(error_class, message, exit_code)` carried out of a `block_on` body.
pub(crate) type StepError = (&'static str, String, u8);

/// Loads config, installs logging and builds the current-thread runtime every
/// command body runs on.
pub(crate) fn prepare(
    command: &str,
    options: LoadOptions,
) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;
    init_logging(&config.logging);

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

pub(crate) async fn connect_and_migrate(config: &AppConfig) -> Result<DbPool, StepError> {
    let pool = connect_from_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn build_orchestrator(
    config: &AppConfig,
    pool: DbPool,
) -> Result<Orchestrator, StepError> {
    let llm = client_from_config(&config.llm)
        .map_err(|error| (error.class(), error.to_string(), 2u8))?;
    let stages = StageSet::new().map_err(|error| ("prompt_template", error.to_string(), 7u8))?;
    let knowledge =
        KnowledgeBase::new(DEFAULT_HELP_CENTER_URL, config.pipeline.knowledge_max_results);

    Ok(Orchestrator::new(
        llm,
        stages,
        knowledge,
        Arc::new(SqlRecordStore::new(pool)),
        OrchestratorSettings::from_config(config),
    ))
}

pub(crate) fn into_result(command: &str, result: Result<String, StepError>) -> CommandResult {
    match result {
        Ok(message) => CommandResult::success(command, message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}
