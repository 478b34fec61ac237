use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::conversation::ConversationId;
use crate::domain::results::{
    ActionList, KnowledgeArticle, ResolutionRecommendation, RoutingDecision, SimilarConversation,
    TimePrediction,
};
use crate::sentiment::SentimentAnalysis;

/// Pipeline stages in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Sentiment,
    Summarize,
    ExtractActions,
    RetrieveKnowledge,
    Route,
    Embed,
    Similarity,
    Recommend,
    PredictTime,
    Persist,
}

impl Stage {
    pub const ORDER: [Self; 11] = [
        Self::Ingest,
        Self::Sentiment,
        Self::Summarize,
        Self::ExtractActions,
        Self::RetrieveKnowledge,
        Self::Route,
        Self::Embed,
        Self::Similarity,
        Self::Recommend,
        Self::PredictTime,
        Self::Persist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Sentiment => "sentiment",
            Self::Summarize => "summarize",
            Self::ExtractActions => "extract_actions",
            Self::RetrieveKnowledge => "retrieve_knowledge",
            Self::Route => "route",
            Self::Embed => "embed",
            Self::Similarity => "similarity",
            Self::Recommend => "recommend",
            Self::PredictTime => "predict_time",
            Self::Persist => "persist",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|stage| stage.as_str() == value)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a model-backed stage's output matched the JSON contract or was recovered heuristically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Structured,
    BestEffort,
}

/// Per-stage elapsed seconds, kept in pipeline order and serialized as a JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageTimings(Vec<(Stage, f64)>);

impl StageTimings {
    pub fn record(&mut self, stage: Stage, seconds: f64) {
        match self.0.iter_mut().find(|(existing, _)| *existing == stage) {
            Some(entry) => entry.1 = seconds,
            None => {
                self.0.push((stage, seconds));
                self.0.sort_by_key(|(stage, _)| *stage);
            }
        }
    }

    pub fn get(&self, stage: Stage) -> Option<f64> {
        self.0.iter().find(|(existing, _)| *existing == stage).map(|(_, seconds)| *seconds)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, f64)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for StageTimings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (stage, seconds) in &self.0 {
            map.serialize_entry(stage.as_str(), seconds)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StageTimings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
        let mut timings = Self::default();
        for (key, seconds) in raw {
            let stage = Stage::parse(&key)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown stage `{key}`")))?;
            timings.record(stage, seconds);
        }
        Ok(timings)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTime {
    pub start: DateTime<Utc>,
    pub steps: StageTimings,
    pub total: f64,
}

/// Consolidated output of one successful pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub conversation_id: ConversationId,
    pub processing_time: ProcessingTime,
    pub sentiment_analysis: SentimentAnalysis,
    pub summary: String,
    pub actions: ActionList,
    pub knowledge_articles: Vec<KnowledgeArticle>,
    pub routing: RoutingDecision,
    pub similar_conversations: Vec<SimilarConversation>,
    pub recommendations: ResolutionRecommendation,
    pub time_prediction: TimePrediction,
    #[serde(default)]
    pub parse_modes: BTreeMap<Stage, ParseMode>,
}
