pub mod config;
pub mod domain;
pub mod entities;
pub mod errors;
pub mod knowledge;
pub mod samples;
pub mod sentiment;
pub mod similarity;
pub mod transcript;

pub use domain::conversation::{Conversation, ConversationId, ConversationMetadata, Speaker, Turn};
pub use domain::embedding::{EmbeddingVector, StoredEmbedding};
pub use domain::history::{HistoricalTicket, HistoryGenerator};
pub use domain::record::{ParseMode, ProcessingRecord, ProcessingTime, Stage, StageTimings};
pub use domain::results::{
    ActionItem, ActionList, ActionStatus, ConfidenceLabel, KnowledgeArticle, Priority,
    ResolutionRecommendation, ResolutionStep, RoutingDecision, SimilarConversation, TimeCategory,
    TimePrediction,
};
pub use errors::DomainError;
pub use knowledge::KnowledgeBase;
pub use sentiment::{SentimentAnalysis, SentimentLabel, SentimentScope};
pub use similarity::SimilarityLookup;
pub use transcript::{format_conversation, TranscriptError, TranscriptFormat};
