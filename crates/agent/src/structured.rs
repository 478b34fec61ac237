use serde::de::DeserializeOwned;

use supportflow_core::domain::record::ParseMode;

/// Outcome of parsing one stage response: either it matched the JSON contract, or the
/// value was recovered by line heuristics and the raw text is kept alongside.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedStageOutput<T> {
    Structured(T),
    BestEffort { value: T, raw: String },
}

impl<T> ParsedStageOutput<T> {
    /// Tries the JSON contract first and falls back to `heuristic` over the raw text.
    pub fn parse_with<F>(raw: &str, heuristic: F) -> Self
    where
        T: DeserializeOwned,
        F: FnOnce(&str) -> T,
    {
        Self::parse_payload::<T, _, _>(raw, Some, heuristic)
    }

    /// Like `parse_with`, but decodes a wire payload `P` that must still pass `convert`
    /// before it counts as structured.
    pub fn parse_payload<P, C, F>(raw: &str, convert: C, heuristic: F) -> Self
    where
        P: DeserializeOwned,
        C: FnOnce(P) -> Option<T>,
        F: FnOnce(&str) -> T,
    {
        match extract_json_object::<P>(raw).and_then(convert) {
            Some(value) => Self::Structured(value),
            None => Self::BestEffort { value: heuristic(raw), raw: raw.to_string() },
        }
    }

    pub fn mode(&self) -> ParseMode {
        match self {
            Self::Structured(_) => ParseMode::Structured,
            Self::BestEffort { .. } => ParseMode::BestEffort,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Structured(value) | Self::BestEffort { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Structured(value) | Self::BestEffort { value, .. } => value,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParsedStageOutput<U> {
        match self {
            Self::Structured(value) => ParsedStageOutput::Structured(f(value)),
            Self::BestEffort { value, raw } => ParsedStageOutput::BestEffort { value: f(value), raw },
        }
    }
}

/// Decodes the whole response, or failing that the outermost `{ ... }` span inside it
/// (models like to wrap JSON in prose or code fences).
pub fn extract_json_object<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<T>(&trimmed[start..=end]).ok()
}
