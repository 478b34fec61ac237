use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("conversation id must not be empty")]
    MissingConversationId,
    #[error("conversation `{0}` has no turns")]
    EmptyConversation(String),
    #[error("unknown speaker label `{0}` (expected customer or agent)")]
    UnknownSpeaker(String),
    #[error(
        "embedding mismatch: expected {expected_model}/{expected_dimension}, found {found_model}/{found_dimension}"
    )]
    EmbeddingMismatch {
        expected_model: String,
        expected_dimension: usize,
        found_model: String,
        found_dimension: usize,
    },
    #[error("embedding vector must not be empty")]
    EmptyEmbedding,
    #[error("malformed transcript at line {line}: {reason}")]
    MalformedTranscript { line: usize, reason: String },
    #[error("unknown sample conversation `{0}`")]
    UnknownSample(String),
}

impl DomainError {
    /// Stable, machine-readable class used in CLI outcomes and logs.
    pub fn class(&self) -> &'static str {
        match self {
            Self::MissingConversationId | Self::EmptyConversation(_) => "conversation_validation",
            Self::UnknownSpeaker(_) | Self::MalformedTranscript { .. } => "transcript_format",
            Self::EmbeddingMismatch { .. } | Self::EmptyEmbedding => "embedding_validation",
            Self::UnknownSample(_) => "unknown_sample",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::DomainError;

    #[test]
    fn empty_conversation_names_the_conversation() {
        let error = DomainError::EmptyConversation("conv-1".to_owned());

        assert_eq!(error.to_string(), "conversation `conv-1` has no turns");
        assert_eq!(error.class(), "conversation_validation");
    }

    #[test]
    fn embedding_mismatch_reports_both_shapes() {
        let error = DomainError::EmbeddingMismatch {
            expected_model: "llama3".to_owned(),
            expected_dimension: 10,
            found_model: "llama3".to_owned(),
            found_dimension: 4,
        };

        assert_eq!(error.to_string(), "embedding mismatch: expected llama3/10, found llama3/4");
        assert_eq!(error.class(), "embedding_validation");
    }

    #[test]
    fn transcript_errors_share_a_class() {
        let speaker = DomainError::UnknownSpeaker("bot".to_owned());
        let malformed =
            DomainError::MalformedTranscript { line: 2, reason: "missing header".to_owned() };

        assert_eq!(speaker.class(), malformed.class());
        assert_eq!(malformed.to_string(), "malformed transcript at line 2: missing header");
    }
}
