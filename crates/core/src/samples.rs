//! Bundled demonstration conversations, addressable by name or conversation id.

use crate::domain::conversation::Conversation;
use crate::errors::DomainError;
use crate::transcript::{ConversationDocument, TranscriptError};

pub struct Sample {
    pub name: &'static str,
    raw: &'static str,
}

pub const SAMPLES: &[Sample] = &[
    Sample { name: "password_reset", raw: include_str!("../data/samples/password_reset.json") },
    Sample { name: "billing_issue", raw: include_str!("../data/samples/billing_issue.json") },
    Sample { name: "technical_issue", raw: include_str!("../data/samples/technical_issue.json") },
];

impl Sample {
    pub fn document(&self) -> Result<ConversationDocument, TranscriptError> {
        Ok(serde_json::from_str(self.raw)?)
    }

    pub fn conversation(&self) -> Result<Conversation, TranscriptError> {
        Ok(self.document()?.into_conversation()?)
    }
}

pub fn names() -> impl Iterator<Item = &'static str> {
    SAMPLES.iter().map(|sample| sample.name)
}

/// Looks a sample up by its name (`billing_issue`) or its conversation id (`conv456`).
pub fn find(key: &str) -> Result<Conversation, TranscriptError> {
    for sample in SAMPLES {
        if sample.name == key {
            return sample.conversation();
        }
        let conversation = sample.conversation()?;
        if conversation.id().as_str() == key {
            return Ok(conversation);
        }
    }

    Err(DomainError::UnknownSample(key.to_string()).into())
}

pub fn all() -> Result<Vec<Conversation>, TranscriptError> {
    SAMPLES.iter().map(Sample::conversation).collect()
}
