//! Lexicon-based sentiment scoring over an ordered sequence of turns.
//!
//! Each turn is scored as the sign of its positive minus negative keyword count.
//! The overall score is `(P - N) / (P + N)` over every analysed turn, and a shift
//! is recorded whenever two adjacent analysed turns carry different scores.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Speaker, Turn};

pub const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "fantastic",
    "terrific",
    "outstanding",
    "superb",
    "brilliant",
    "perfect",
    "happy",
    "pleased",
    "satisfied",
    "impressed",
    "thankful",
    "appreciate",
    "helpful",
    "resolved",
    "solved",
    "fixed",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "horrible",
    "disappointing",
    "poor",
    "inadequate",
    "unacceptable",
    "frustrated",
    "annoyed",
    "angry",
    "upset",
    "unhappy",
    "dissatisfied",
    "problem",
    "issue",
    "error",
    "failure",
    "broken",
    "useless",
    "waste",
    "difficult",
];

const LABEL_THRESHOLD: f64 = 0.2;
const MAX_EVIDENCE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    fn from_overall(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            Self::Positive
        } else if score < -LABEL_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    fn from_turn(score: i8) -> Self {
        match score {
            1 => Self::Positive,
            -1 => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SentimentScope {
    #[default]
    AllTurns,
    CustomerOnly,
}

impl SentimentScope {
    pub fn from_customer_only(customer_only: bool) -> Self {
        if customer_only {
            Self::CustomerOnly
        } else {
            Self::AllTurns
        }
    }

    fn includes(self, turn: &Turn) -> bool {
        match self {
            Self::AllTurns => true,
            Self::CustomerOnly => turn.speaker == Speaker::Customer,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverallSentiment {
    pub sentiment: SentimentLabel,
    pub score: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_evidence: Vec<String>,
    pub negative_evidence: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnSentiment {
    pub turn_index: usize,
    pub speaker: Speaker,
    pub timestamp: String,
    pub sentiment: SentimentLabel,
    pub score: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftDirection {
    Positive,
    Negative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentShift {
    pub from_timestamp: String,
    pub to_timestamp: String,
    pub shift_value: f64,
    pub direction: ShiftDirection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub overall_sentiment: OverallSentiment,
    pub progression: Vec<TurnSentiment>,
    pub shifts: Vec<SentimentShift>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LexiconHits {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl LexiconHits {
    fn turn_score(&self) -> i8 {
        match self.positive.len().cmp(&self.negative.len()) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        }
    }
}

pub fn analyze(turns: &[Turn], scope: SentimentScope) -> SentimentAnalysis {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    let mut progression = Vec::new();

    for (turn_index, turn) in turns.iter().enumerate().filter(|(_, turn)| scope.includes(turn)) {
        let hits = lexicon_hits(&turn.text);
        let score = hits.turn_score();

        progression.push(TurnSentiment {
            turn_index,
            speaker: turn.speaker,
            timestamp: turn.timestamp.clone().unwrap_or_default(),
            sentiment: SentimentLabel::from_turn(score),
            score: f64::from(score),
        });
        positive.extend(hits.positive);
        negative.extend(hits.negative);
    }

    let shifts = detect_shifts(&progression);
    let overall_sentiment = overall(positive, negative);

    SentimentAnalysis { overall_sentiment, progression, shifts }
}

/// Scores a free-standing piece of text with the same lexicons and thresholds.
pub fn analyze_text(text: &str) -> OverallSentiment {
    let hits = lexicon_hits(text);
    overall(hits.positive, hits.negative)
}

fn overall(positive: Vec<String>, negative: Vec<String>) -> OverallSentiment {
    let positive_count = positive.len();
    let negative_count = negative.len();
    let total = positive_count + negative_count;
    let score = if total == 0 {
        0.0
    } else {
        (positive_count as f64 - negative_count as f64) / total as f64
    };

    OverallSentiment {
        sentiment: SentimentLabel::from_overall(score),
        score,
        positive_count,
        negative_count,
        positive_evidence: positive.into_iter().take(MAX_EVIDENCE).collect(),
        negative_evidence: negative.into_iter().take(MAX_EVIDENCE).collect(),
    }
}

fn detect_shifts(progression: &[TurnSentiment]) -> Vec<SentimentShift> {
    progression
        .windows(2)
        .filter_map(|pair| {
            let delta = pair[1].score - pair[0].score;
            if delta == 0.0 {
                return None;
            }
            Some(SentimentShift {
                from_timestamp: pair[0].timestamp.clone(),
                to_timestamp: pair[1].timestamp.clone(),
                shift_value: delta,
                direction: if delta > 0.0 {
                    ShiftDirection::Positive
                } else {
                    ShiftDirection::Negative
                },
            })
        })
        .collect()
}

fn lexicon_hits(text: &str) -> LexiconHits {
    let mut hits = LexiconHits::default();
    for word in tokenize(text) {
        if POSITIVE_WORDS.contains(&word.as_str()) {
            hits.positive.push(word);
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            hits.negative.push(word);
        }
    }
    hits
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
        .filter(|word| !word.is_empty())
        .map(|word| word.trim_matches('\'').to_lowercase())
}
