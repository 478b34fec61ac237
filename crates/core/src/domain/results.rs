use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "high", alias = "HIGH", alias = "Critical", alias = "critical")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionStatus {
    #[serde(alias = "pending", alias = "PENDING", alias = "Open", alias = "open")]
    Pending,
    #[serde(
        rename = "In Progress",
        alias = "in_progress",
        alias = "InProgress",
        alias = "in progress"
    )]
    InProgress,
    #[serde(alias = "completed", alias = "COMPLETED", alias = "Done", alias = "done")]
    Completed,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub action: String,
    pub priority: Priority,
    pub status: ActionStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionList {
    pub action_items: Vec<ActionItem>,
    pub total_actions: usize,
}

impl ActionList {
    pub fn new(action_items: Vec<ActionItem>) -> Self {
        let total_actions = action_items.len();
        Self { action_items, total_actions }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl ConfidenceLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub recommended_team: String,
    pub confidence: ConfidenceLabel,
    pub justification: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStep {
    pub action: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecommendation {
    pub immediate_steps: Vec<ResolutionStep>,
    pub complete_resolution_path: Vec<ResolutionStep>,
    pub reasoning: String,
    pub confidence_score: f64,
}

/// Duration buckets a prediction can land in, with the default hour estimate for each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeCategory {
    VeryQuick,
    Quick,
    Medium,
    Long,
    VeryLong,
    Complex,
}

impl TimeCategory {
    pub const ALL: [Self; 6] =
        [Self::VeryQuick, Self::Quick, Self::Medium, Self::Long, Self::VeryLong, Self::Complex];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryQuick => "very_quick",
            Self::Quick => "quick",
            Self::Medium => "medium",
            Self::Long => "long",
            Self::VeryLong => "very_long",
            Self::Complex => "complex",
        }
    }

    pub fn default_hours(self) -> u32 {
        match self {
            Self::VeryQuick => 1,
            Self::Quick => 2,
            Self::Medium => 4,
            Self::Long => 8,
            Self::VeryLong => 24,
            Self::Complex => 48,
        }
    }

    pub fn default_estimate(self) -> String {
        let hours = self.default_hours();
        if hours == 1 {
            "1 hour".to_string()
        } else {
            format!("{hours} hours")
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|category| category.as_str() == normalized)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePrediction {
    pub resolution_time_category: String,
    pub estimated_time: String,
    pub explanation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarConversation {
    pub source_id: String,
    pub text: String,
    pub similarity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    pub title: String,
    pub content: String,
    pub url: String,
    pub relevance: f64,
}
