use serde::{Deserialize, Serialize};

use crate::sentiment::SentimentLabel;

const PRODUCT_KEYWORDS: &[&str] = &["laptop", "phone", "tablet", "computer", "printer", "software"];
const ISSUE_KEYWORDS: &[&str] =
    &["broken", "error", "not working", "issue", "problem", "bug", "crash"];
const MOOD_POSITIVE: &[&str] = &["happy", "satisfied", "great", "excellent"];
const MOOD_NEGATIVE: &[&str] = &["unhappy", "disappointed", "frustrated", "angry"];

/// Coarse keyword entities that give later prompts extra context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub products: Vec<String>,
    pub issues: Vec<String>,
    pub customer_sentiment: SentimentLabel,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.issues.is_empty()
            && self.customer_sentiment == SentimentLabel::Neutral
    }
}

pub fn extract(text: &str) -> ExtractedEntities {
    let lowered = text.to_lowercase();
    let matches = |keywords: &[&str]| -> Vec<String> {
        keywords
            .iter()
            .filter(|keyword| lowered.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect()
    };

    let positive = MOOD_POSITIVE.iter().filter(|word| lowered.contains(*word)).count();
    let negative = MOOD_NEGATIVE.iter().filter(|word| lowered.contains(*word)).count();
    let customer_sentiment = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => SentimentLabel::Positive,
        std::cmp::Ordering::Less => SentimentLabel::Negative,
        std::cmp::Ordering::Equal => SentimentLabel::Neutral,
    };

    ExtractedEntities {
        products: matches(PRODUCT_KEYWORDS),
        issues: matches(ISSUE_KEYWORDS),
        customer_sentiment,
    }
}
