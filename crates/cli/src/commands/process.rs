use std::fs;
use std::path::{Path, PathBuf};

use supportflow_core::config::LoadOptions;
use supportflow_core::domain::conversation::Conversation;
use supportflow_core::domain::record::ProcessingRecord;
use supportflow_core::samples;
use supportflow_core::transcript::{self, TranscriptFormat};

use crate::commands::{
    build_orchestrator, connect_and_migrate, into_result, prepare, CommandResult, StepError,
};

#[derive(Clone, Debug)]
pub enum ConversationSource {
    /// Bundled sample, by name or conversation id.
    Sample(String),
    /// Transcript file; `.json` files are conversation documents, anything else is text.
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct ProcessArgs {
    pub source: ConversationSource,
    pub output: Option<PathBuf>,
}

pub fn run(options: LoadOptions, args: ProcessArgs) -> CommandResult {
    let conversation = match load_conversation(&args.source) {
        Ok(conversation) => conversation,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("process", error_class, message, exit_code);
        }
    };

    let (config, runtime) = match prepare("process", options) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_and_migrate(&config).await?;
        let orchestrator = build_orchestrator(&config, pool.clone())?;

        let processed = orchestrator
            .process(&conversation)
            .await
            .map_err(|error| (error.class(), error.to_string(), 7u8));
        pool.close().await;
        let record = processed?;

        let mut message = describe(&record);
        if let Some(path) = &args.output {
            write_record(path, &record)?;
            message.push_str(&format!("; results written to {}", path.display()));
        }
        Ok::<String, StepError>(message)
    });

    into_result("process", result)
}

pub(crate) fn load_conversation(source: &ConversationSource) -> Result<Conversation, StepError> {
    match source {
        ConversationSource::Sample(key) => {
            samples::find(key).map_err(|error| ("input_validation", error.to_string(), 6u8))
        }
        ConversationSource::File(path) => read_transcript(path),
    }
}

pub(crate) fn read_transcript(path: &Path) -> Result<Conversation, StepError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ("input_read", format!("could not read `{}`: {error}", path.display()), 6u8)
    })?;
    let fallback_id = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("conversation");

    transcript::parse(&raw, TranscriptFormat::from_path(path), fallback_id).map_err(|error| {
        ("input_validation", format!("invalid transcript `{}`: {error}", path.display()), 6u8)
    })
}

pub(crate) fn write_record(path: &Path, record: &ProcessingRecord) -> Result<(), StepError> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|error| ("serialization", error.to_string(), 8u8))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            ("output_write", format!("could not create `{}`: {error}", parent.display()), 8u8)
        })?;
    }
    fs::write(path, json).map_err(|error| {
        ("output_write", format!("could not write `{}`: {error}", path.display()), 8u8)
    })
}

fn describe(record: &ProcessingRecord) -> String {
    format!(
        "processed conversation {}: sentiment {} ({:.3}), routed to {}, {} resolution, {} action items",
        record.conversation_id,
        record.sentiment_analysis.overall_sentiment.sentiment.as_str(),
        record.sentiment_analysis.overall_sentiment.score,
        record.routing.recommended_team,
        record.time_prediction.resolution_time_category,
        record.actions.action_items.len()
    )
}
