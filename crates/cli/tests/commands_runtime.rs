use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use supportflow_cli::commands::batch::{self, BatchArgs};
use supportflow_cli::commands::process::{self, ConversationSource, ProcessArgs};
use supportflow_cli::commands::{config, doctor, history, migrate, seed, show};
use supportflow_core::config::LoadOptions;
use supportflow_core::domain::history::HistoryGenerator;
use supportflow_db::SeedDataset;
use tempfile::TempDir;

#[test]
fn migrate_succeeds_against_fresh_database() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());

    with_env(&[("SUPPORTFLOW_DATABASE_URL", &db_url)], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected migrate success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
    });
}

#[test]
fn migrate_fails_with_config_error_on_invalid_override() {
    with_env(&[("SUPPORTFLOW_DATABASE_MAX_CONNECTIONS", "many")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_fails_when_database_is_unreachable() {
    with_env(&[("SUPPORTFLOW_DATABASE_URL", "sqlite:///definitely/missing/dir/db.sqlite")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 4, "expected db connectivity failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());

    with_env(&[("SUPPORTFLOW_DATABASE_URL", &db_url), ("SUPPORTFLOW_LLM_SIMULATE", "true")], || {
        let first = seed::run(LoadOptions::default());
        assert_eq!(first.exit_code, 0, "expected first seed success: {}", first.output);
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run(LoadOptions::default());
        assert_eq!(second.exit_code, 0, "expected second seed success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
        assert!(first_payload["message"]
            .as_str()
            .is_some_and(|message| message.contains("100 historical tickets")));
    });
}

#[test]
fn process_sample_writes_record_that_show_reads_back() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());
    let output = dir.path().join("out").join("conv123.json");

    with_env(&[("SUPPORTFLOW_DATABASE_URL", &db_url), ("SUPPORTFLOW_LLM_SIMULATE", "true")], || {
        let result = process::run(
            LoadOptions::default(),
            ProcessArgs {
                source: ConversationSource::Sample("password_reset".to_string()),
                output: Some(output.clone()),
            },
        );
        assert_eq!(result.exit_code, 0, "expected process success: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "process");
        assert!(payload["message"]
            .as_str()
            .is_some_and(|message| message.contains("routed to Account Management")));

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output).expect("output file")).expect("json");
        assert_eq!(written["conversation_id"], "conv123");
        assert_eq!(written["time_prediction"]["resolution_time_category"], "quick");

        let shown = show::run(LoadOptions::default(), "conv123".to_string());
        assert_eq!(shown.exit_code, 0, "expected show success: {}", shown.output);
        let stored: Value = serde_json::from_str(&shown.output).expect("record json");
        assert_eq!(stored["summary"], written["summary"]);
        assert_eq!(stored["routing"], written["routing"]);
    });
}

#[test]
fn process_reports_failing_stage_when_model_is_unreachable() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());

    with_env(
        &[
            ("SUPPORTFLOW_DATABASE_URL", &db_url),
            ("SUPPORTFLOW_LLM_BASE_URL", "http://127.0.0.1:9"),
            ("SUPPORTFLOW_LLM_MAX_RETRIES", "0"),
            ("SUPPORTFLOW_LLM_TIMEOUT_SECS", "2"),
        ],
        || {
            let result = process::run(
                LoadOptions::default(),
                ProcessArgs {
                    source: ConversationSource::Sample("billing_issue".to_string()),
                    output: None,
                },
            );
            assert_eq!(result.exit_code, 7, "expected pipeline failure: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert!(payload["message"]
                .as_str()
                .is_some_and(|message| message.contains("stage `summarize`")));

            let shown = show::run(LoadOptions::default(), "conv456".to_string());
            assert_eq!(shown.exit_code, 6, "nothing should be stored for a failed run");
            assert_eq!(parse_payload(&shown.output)["error_class"], "not_found");
        },
    );
}

#[test]
fn process_rejects_unknown_sample_before_touching_storage() {
    with_env(&[("SUPPORTFLOW_DATABASE_URL", "not-a-sqlite-url")], || {
        let result = process::run(
            LoadOptions::default(),
            ProcessArgs { source: ConversationSource::Sample("nope".to_string()), output: None },
        );
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "input_validation");
    });
}

#[test]
fn batch_processes_every_transcript_and_writes_results() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());
    let inputs = dir.path().join("transcripts");
    let outputs = dir.path().join("results");
    fs::create_dir_all(&inputs).expect("inputs dir");
    write_transcript(&inputs, "first.txt", "T-1", "My laptop shows an error after the update.");
    write_transcript(&inputs, "second.txt", "T-2", "I was charged twice, please refund me.");

    with_env(
        &[
            ("SUPPORTFLOW_DATABASE_URL", &db_url),
            ("SUPPORTFLOW_LLM_SIMULATE", "true"),
            ("SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY", "2"),
        ],
        || {
            let result = batch::run(
                LoadOptions::default(),
                BatchArgs { directory: inputs.clone(), output_dir: outputs.clone() },
            );
            assert_eq!(result.exit_code, 0, "expected batch success: {}", result.output);
            assert!(parse_payload(&result.output)["message"]
                .as_str()
                .is_some_and(|message| message.starts_with("processed 2 of 2")));

            for (stem, id) in [("first", "T-1"), ("second", "T-2")] {
                let path = outputs.join(format!("{stem}_results.json"));
                let record: Value = serde_json::from_str(
                    &fs::read_to_string(&path).expect("batch output file"),
                )
                .expect("json");
                assert_eq!(record["conversation_id"], id);
            }
        },
    );
}

#[test]
fn batch_names_outputs_by_file_and_reports_repeated_ids() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());
    let inputs = dir.path().join("transcripts");
    let outputs = dir.path().join("results");
    fs::create_dir_all(&inputs).expect("inputs dir");
    write_transcript(&inputs, "monday.txt", "DUP", "My laptop shows an error after the update.");
    write_transcript(&inputs, "tuesday.txt", "DUP", "I was charged twice, please refund me.");
    write_transcript(&inputs, "escape.txt", "../escaped", "I cannot log in to my account.");

    with_env(
        &[("SUPPORTFLOW_DATABASE_URL", &db_url), ("SUPPORTFLOW_LLM_SIMULATE", "true")],
        || {
            let result = batch::run(
                LoadOptions::default(),
                BatchArgs { directory: inputs.clone(), output_dir: outputs.clone() },
            );
            assert_eq!(result.exit_code, 7, "expected partial failure: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "batch_partial_failure");
            let message = payload["message"].as_str().expect("message");
            assert!(message.starts_with("processed 2 of 3"), "{message}");
            assert!(message.contains("tuesday (duplicate_conversation_id DUP)"), "{message}");

            let mut written: Vec<String> = fs::read_dir(&outputs)
                .expect("results dir")
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            written.sort();
            assert_eq!(written, vec!["escape_results.json", "monday_results.json"]);
            assert!(!dir.path().join("escaped_results.json").exists());

            let escaped: Value = serde_json::from_str(
                &fs::read_to_string(outputs.join("escape_results.json")).expect("escape output"),
            )
            .expect("json");
            assert_eq!(escaped["conversation_id"], "../escaped");
        },
    );
}

#[test]
fn batch_reports_empty_directory_as_input_error() {
    let dir = TempDir::new().expect("tempdir");

    with_env(&[], || {
        let result = batch::run(
            LoadOptions::default(),
            BatchArgs { directory: dir.path().to_path_buf(), output_dir: dir.path().join("out") },
        );
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "input_validation");
    });
}

#[test]
fn history_lists_seeded_tickets_for_issue_type() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());
    let dataset = SeedDataset::default();
    let expected = HistoryGenerator::new(dataset.history_seed, dataset.anchor)
        .generate(dataset.ticket_count)
        .into_iter()
        .filter(|ticket| ticket.issue_type == "Login Problem")
        .count()
        .min(5);

    with_env(&[("SUPPORTFLOW_DATABASE_URL", &db_url), ("SUPPORTFLOW_LLM_SIMULATE", "true")], || {
        assert_eq!(seed::run(LoadOptions::default()).exit_code, 0);

        let result = history::run(LoadOptions::default(), "login problem".to_string(), 5);
        assert_eq!(result.exit_code, 0, "expected history success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "history");
        let tickets = payload["tickets"].as_array().expect("tickets array");
        assert_eq!(tickets.len(), expected);
        assert!(tickets.iter().all(|ticket| ticket["issue_type"] == "Login Problem"));
    });
}

#[test]
fn config_reports_sources_and_redacts_api_key() {
    with_env(
        &[("SUPPORTFLOW_LLM_API_KEY", "sk-secret-value"), ("SUPPORTFLOW_LLM_MODEL", "mistral")],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0);

            assert!(result
                .output
                .contains("- llm.model = mistral (source: env (SUPPORTFLOW_LLM_MODEL))"));
            assert!(result.output.contains("- llm.api_key = sk-*** (source: env (SUPPORTFLOW_LLM_API_KEY))"));
            assert!(result.output.contains("- pipeline.max_concurrency = 2 (source: default)"));
            assert!(!result.output.contains("secret-value"));
        },
    );
}

#[test]
fn config_reads_explicit_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("supportflow.toml");
    fs::write(&path, "[pipeline]\nsimilar_limit = 7\n").expect("write config");

    with_env(&[], || {
        let result = config::run(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains(&format!(
            "- pipeline.similar_limit = 7 (source: file ({}))",
            path.display()
        )));
    });
}

#[test]
fn doctor_passes_in_simulate_mode() {
    let dir = TempDir::new().expect("tempdir");
    let db_url = database_url(dir.path());

    with_env(&[("SUPPORTFLOW_DATABASE_URL", &db_url), ("SUPPORTFLOW_LLM_SIMULATE", "true")], || {
        let result = doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "expected doctor pass: {}", result.output);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        let names: Vec<&str> = report["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, vec!["config_validation", "database_connectivity", "model_backend"]);
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("SUPPORTFLOW_LOGGING_LEVEL", "chatty")], || {
        let result = doctor::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [skip] database_connectivity"));
        assert!(result.output.contains("- [skip] model_backend"));
    });
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("supportflow.db").display())
}

fn write_transcript(dir: &Path, name: &str, id: &str, complaint: &str) {
    let body = format!(
        "Conversation ID: {id}\nCategory: Support\nSentiment: Negative | Priority: High\n\n\
         Customer: \"{complaint}\"\nAgent: \"Thanks, I'm looking into it now.\"\n\
         Customer: \"Great, thank you.\"\n"
    );
    fs::write(dir.join(name), body).expect("write transcript");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "SUPPORTFLOW_DATABASE_URL",
        "SUPPORTFLOW_DATABASE_MAX_CONNECTIONS",
        "SUPPORTFLOW_DATABASE_TIMEOUT_SECS",
        "SUPPORTFLOW_LLM_BASE_URL",
        "SUPPORTFLOW_LLM_MODEL",
        "SUPPORTFLOW_LLM_EMBEDDING_MODEL",
        "SUPPORTFLOW_LLM_API_KEY",
        "SUPPORTFLOW_LLM_TIMEOUT_SECS",
        "SUPPORTFLOW_LLM_MAX_RETRIES",
        "SUPPORTFLOW_LLM_RETRY_DELAY_MS",
        "SUPPORTFLOW_LLM_SIMULATE",
        "SUPPORTFLOW_PIPELINE_MAX_CONCURRENCY",
        "SUPPORTFLOW_PIPELINE_CONVERSATION_DEADLINE_SECS",
        "SUPPORTFLOW_PIPELINE_SIMILAR_LIMIT",
        "SUPPORTFLOW_PIPELINE_KNOWLEDGE_MAX_RESULTS",
        "SUPPORTFLOW_SENTIMENT_CUSTOMER_ONLY",
        "SUPPORTFLOW_LOGGING_LEVEL",
        "SUPPORTFLOW_LOGGING_FORMAT",
        "SUPPORTFLOW_LOG_LEVEL",
        "SUPPORTFLOW_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
