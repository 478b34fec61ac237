//! Conversation ingestion formats and the prompt-facing text rendering.
//!
//! Two on-disk formats are accepted:
//!
//! * JSON documents shaped as `{"conversation_id", "messages": [{"sender", "content", "timestamp"}]}`.
//! * Plain-text transcripts with a three line header followed by `Speaker: "utterance"` lines:
//!
//! ```text
//! Conversation ID: TECH_002
//! Category: Technical Support
//! Sentiment: Frustrated | Priority: High
//! Customer: "My export keeps failing."
//! Agent: "Let me take a look."
//! ```
//!
//! Text transcripts carry no timestamps, so turns are stamped from a fixed
//! base time in five minute steps.

use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversation::{Conversation, ConversationMetadata, Speaker, Turn};
use crate::errors::DomainError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TURN_SPACING_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid conversation json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscriptFormat {
    Json,
    Text,
}

impl TranscriptFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDocument {
    pub sender: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDocument {
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageDocument>,
}

impl ConversationDocument {
    pub fn into_conversation(self) -> Result<Conversation, DomainError> {
        let turns = self
            .messages
            .into_iter()
            .map(|message| {
                Ok(Turn {
                    speaker: Speaker::parse_label(&message.sender)?,
                    text: message.content,
                    timestamp: message.timestamp.filter(|value| !value.trim().is_empty()),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let metadata = ConversationMetadata {
            category: self.category,
            reported_sentiment: self.sentiment,
            priority: self.priority,
        };
        Conversation::with_metadata(self.conversation_id, turns, metadata)
    }
}

/// Parses a conversation from raw file contents. `fallback_id` is used when a
/// text transcript header does not carry an id.
pub fn parse(
    raw: &str,
    format: TranscriptFormat,
    fallback_id: &str,
) -> Result<Conversation, TranscriptError> {
    match format {
        TranscriptFormat::Json => {
            let document: ConversationDocument = serde_json::from_str(raw)?;
            Ok(document.into_conversation()?)
        }
        TranscriptFormat::Text => Ok(parse_text(raw, fallback_id)?),
    }
}

pub fn parse_text(raw: &str, fallback_id: &str) -> Result<Conversation, DomainError> {
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() < 3 {
        return Err(DomainError::MalformedTranscript {
            line: lines.len() + 1,
            reason: "expected `Conversation ID`, `Category` and `Sentiment | Priority` header lines"
                .to_string(),
        });
    }

    let id = header_value(lines[0]).unwrap_or_else(|| fallback_id.to_string());
    let category = header_value(lines[1]);
    let (reported_sentiment, priority) = sentiment_priority(lines[2]);

    let mut turns = Vec::new();
    for (offset, line) in lines.iter().enumerate().skip(3) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((sender, content)) = line.split_once(':') else {
            continue;
        };

        let speaker = Speaker::parse_label(sender).map_err(|_| DomainError::MalformedTranscript {
            line: offset + 1,
            reason: format!("unknown speaker `{}`", sender.trim()),
        })?;
        let timestamp = synthetic_timestamp(turns.len());
        turns.push(Turn::new(speaker, content.trim().trim_matches('"')).at(timestamp));
    }

    let metadata = ConversationMetadata { category, reported_sentiment, priority };
    Conversation::with_metadata(id, turns, metadata)
}

/// Renders turns as `Speaker (timestamp): text` blocks separated by blank lines.
pub fn format_conversation(conversation: &Conversation) -> String {
    conversation.turns().iter().map(format_turn).collect::<Vec<_>>().join("\n\n")
}

pub fn format_turn(turn: &Turn) -> String {
    match turn.timestamp.as_deref() {
        Some(timestamp) => format!("{} ({timestamp}): {}", turn.speaker, turn.text),
        None => format!("{}: {}", turn.speaker, turn.text),
    }
}

fn header_value(line: &str) -> Option<String> {
    line.split_once(':')
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn sentiment_priority(line: &str) -> (Option<String>, Option<String>) {
    let mut sentiment = None;
    let mut priority = None;

    for part in line.split('|') {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "sentiment" => sentiment = Some(value.to_string()),
            "priority" => priority = Some(value.to_string()),
            _ => {}
        }
    }

    (sentiment, priority)
}

fn synthetic_timestamp(index: usize) -> String {
    let base = NaiveDate::from_ymd_opt(2023, 7, 15)
        .and_then(|date| date.and_hms_opt(10, 0, 0))
        .unwrap_or(NaiveDateTime::MIN);
    let offset = Duration::minutes(TURN_SPACING_MINUTES * index as i64);
    (base + offset).format(TIMESTAMP_FORMAT).to_string()
}
