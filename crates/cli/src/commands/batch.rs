use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use supportflow_agent::PipelineRuntime;
use supportflow_core::config::LoadOptions;
use supportflow_core::domain::conversation::Conversation;

use crate::commands::process::{read_transcript, write_record};
use crate::commands::{
    build_orchestrator, connect_and_migrate, into_result, prepare, CommandResult, StepError,
};

#[derive(Clone, Debug)]
pub struct BatchArgs {
    pub directory: PathBuf,
    pub output_dir: PathBuf,
}

pub fn run(options: LoadOptions, args: BatchArgs) -> CommandResult {
    let files = match transcript_files(&args.directory) {
        Ok(files) if files.is_empty() => {
            return CommandResult::failure(
                "batch",
                "input_validation",
                format!("no .txt transcripts found in `{}`", args.directory.display()),
                6,
            );
        }
        Ok(files) => files,
        Err(error) => {
            return CommandResult::failure("batch", "input_read", format!("{error:#}"), 6);
        }
    };

    let (config, runtime) = match prepare("batch", options) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let loaded = load_transcripts(&files);
    let mut failures = loaded.failures;

    let result = runtime.block_on(async {
        let pool = connect_and_migrate(&config).await?;
        let orchestrator = Arc::new(build_orchestrator(&config, pool.clone())?);
        let pipeline = PipelineRuntime::new(orchestrator, config.pipeline.max_concurrency);

        let (stems, conversations): (Vec<String>, Vec<Conversation>) =
            loaded.transcripts.into_iter().unzip();
        let outcomes = pipeline.process_all(conversations).await;
        pool.close().await;

        let mut written = 0usize;
        for (stem, outcome) in stems.iter().zip(outcomes) {
            match outcome.result {
                Ok(record) => {
                    let path = args.output_dir.join(format!("{stem}_results.json"));
                    write_record(&path, &record)?;
                    written += 1;
                }
                Err(error) => failures.push(format!("{stem} ({})", error.class())),
            }
        }

        let summary = format!(
            "processed {written} of {} transcripts into {}",
            files.len(),
            args.output_dir.display()
        );
        if failures.is_empty() {
            Ok::<String, StepError>(summary)
        } else {
            Err(("batch_partial_failure", format!("{summary}; failed: {}", failures.join(", ")), 7u8))
        }
    });

    into_result("batch", result)
}

struct LoadedTranscripts {
    /// File stem and parsed conversation, in file order.
    transcripts: Vec<(String, Conversation)>,
    failures: Vec<String>,
}

/// Parses every file, keeping the first file per conversation id. Later files that
/// reuse an id are reported as failures and not processed.
fn load_transcripts(files: &[PathBuf]) -> LoadedTranscripts {
    let mut seen_ids = HashSet::new();
    let mut loaded = LoadedTranscripts { transcripts: Vec::new(), failures: Vec::new() };

    for file in files {
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        match read_transcript(file) {
            Ok(conversation) if !seen_ids.insert(conversation.id().clone()) => {
                warn!(
                    event_name = "batch.input.duplicate_id",
                    file = %file.display(),
                    conversation_id = %conversation.id(),
                    "skipping file with a conversation id already in this batch"
                );
                loaded.failures.push(format!(
                    "{stem} (duplicate_conversation_id {})",
                    conversation.id()
                ));
            }
            Ok(conversation) => loaded.transcripts.push((stem, conversation)),
            Err((error_class, message, _)) => {
                warn!(event_name = "batch.input.skipped", error_class, error = %message, "skipping file");
                loaded.failures.push(format!("{stem} ({error_class})"));
            }
        }
    }

    loaded
}

/// `.txt` files directly under `directory`, sorted by name.
fn transcript_files(directory: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("could not read directory `{}`", directory.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("could not list `{}`", directory.display()))?
            .path();
        let is_transcript = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext == "txt");
        if is_transcript {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::{load_transcripts, transcript_files};

    fn transcript(id: &str) -> String {
        format!(
            "Conversation ID: {id}\nCategory: Billing\nSentiment: Negative | Priority: High\n\n\
             Customer: \"I was charged twice.\"\nAgent: \"Let me check.\"\n"
        )
    }

    #[test]
    fn repeated_conversation_ids_keep_only_the_first_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, id) in [("monday.txt", "DUP"), ("tuesday.txt", "DUP"), ("wednesday.txt", "W-1")] {
            std::fs::write(dir.path().join(name), transcript(id)).expect("write");
        }
        let files = transcript_files(dir.path()).expect("list");

        let loaded = load_transcripts(&files);

        let stems: Vec<&str> = loaded.transcripts.iter().map(|(stem, _)| stem.as_str()).collect();
        assert_eq!(stems, vec!["monday", "wednesday"]);
        assert_eq!(loaded.failures, vec!["tuesday (duplicate_conversation_id DUP)".to_string()]);
    }

    #[test]
    fn only_text_files_are_collected_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.txt", "a.txt", "notes.md", "c.json"] {
            std::fs::write(dir.path().join(name), "x").expect("write");
        }

        let files = transcript_files(dir.path()).expect("list");
        let names: Vec<_> = files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn missing_directory_is_reported_with_path() {
        let error = transcript_files(std::path::Path::new("/no/such/dir")).expect_err("missing");

        assert!(format!("{error:#}").contains("/no/such/dir"));
    }
}
