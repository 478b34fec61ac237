use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Customer,
    Agent,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Agent => "Agent",
        }
    }

    /// Maps a free-form sender label from a transcript onto a role. Labels are matched
    /// word by word and agent words win, so "Customer Service Rep" is an agent.
    pub fn parse_label(label: &str) -> Result<Self, DomainError> {
        let normalized = label.trim().to_ascii_lowercase();
        let words: Vec<&str> = normalized
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has_any = |needles: &[&str]| words.iter().any(|word| needles.contains(word));

        if has_any(&["agent", "support", "representative", "rep", "staff", "advisor"]) {
            Ok(Self::Agent)
        } else if has_any(&["customer", "client", "user", "caller"]) {
            Ok(Self::Customer)
        } else {
            Err(DomainError::UnknownSpeaker(label.trim().to_string()))
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: Option<String>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self { speaker, text: text.into(), timestamp: None }
    }

    pub fn at(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Labels carried by transcript headers; informational only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl ConversationMetadata {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.reported_sentiment.is_none() && self.priority.is_none()
    }
}

/// An ingested conversation. Construction validates it; there are no mutators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conversation {
    id: ConversationId,
    turns: Vec<Turn>,
    metadata: ConversationMetadata,
}

impl Conversation {
    pub fn new(id: impl Into<String>, turns: Vec<Turn>) -> Result<Self, DomainError> {
        Self::with_metadata(id, turns, ConversationMetadata::default())
    }

    pub fn with_metadata(
        id: impl Into<String>,
        turns: Vec<Turn>,
        metadata: ConversationMetadata,
    ) -> Result<Self, DomainError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(DomainError::MissingConversationId);
        }
        if turns.is_empty() {
            return Err(DomainError::EmptyConversation(id));
        }

        Ok(Self { id: ConversationId(id), turns, metadata })
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn metadata(&self) -> &ConversationMetadata {
        &self.metadata
    }

    pub fn customer_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|turn| turn.speaker == Speaker::Customer)
    }

    /// Concatenated customer utterances, used for entity extraction.
    pub fn customer_text(&self) -> String {
        self.customer_turns().map(|turn| turn.text.as_str()).collect::<Vec<_>>().join(" ")
    }
}
