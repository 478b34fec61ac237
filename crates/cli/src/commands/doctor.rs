use serde::Serialize;

use supportflow_agent::ollama::OllamaClient;
use supportflow_core::config::{AppConfig, LoadOptions};
use supportflow_db::connect_from_config;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::raw(exit_code, output);
    }

    CommandResult::raw(exit_code, render_human(&report))
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    checks.push(runtime.block_on(check_database_connectivity(&config)));
                    checks.push(runtime.block_on(check_model_backend(&config)));
                }
                Err(error) => {
                    let details = format!("failed to initialize async runtime: {error}");
                    checks.push(DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: details.clone(),
                    });
                    checks.push(DoctorCheck {
                        name: "model_backend",
                        status: CheckStatus::Fail,
                        details,
                    });
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_connectivity", "model_backend"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

async fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    match connect_from_config(&config.database).await {
        Ok(pool) => {
            pool.close().await;
            DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            }
        }
        Err(error) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Fail,
            details: format!("failed to connect to database: {error}"),
        },
    }
}

async fn check_model_backend(config: &AppConfig) -> DoctorCheck {
    if config.llm.simulate {
        return DoctorCheck {
            name: "model_backend",
            status: CheckStatus::Pass,
            details: "simulate mode: canned completions and hashed embeddings".to_string(),
        };
    }

    let listed = match OllamaClient::from_config(&config.llm) {
        Ok(client) => client.list_models().await,
        Err(error) => Err(error),
    };

    match listed {
        Ok(models) => {
            let wanted = config.llm.model.as_str();
            let available = models
                .iter()
                .any(|name| name == wanted || name.split(':').next() == Some(wanted));
            if available {
                DoctorCheck {
                    name: "model_backend",
                    status: CheckStatus::Pass,
                    details: format!("model `{wanted}` available at {}", config.llm.base_url),
                }
            } else {
                DoctorCheck {
                    name: "model_backend",
                    status: CheckStatus::Fail,
                    details: format!(
                        "model `{wanted}` not found at {} (available: {})",
                        config.llm.base_url,
                        if models.is_empty() { "none".to_string() } else { models.join(", ") }
                    ),
                }
            }
        }
        Err(error) => DoctorCheck {
            name: "model_backend",
            status: CheckStatus::Fail,
            details: format!("{} ({})", error, error.class()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
