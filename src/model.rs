use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Part of speech given to a colloquial suggestion once it is kept.
pub const COLLOQUIAL_PART_OF_SPEECH: &str = "Colloquial";

/// One vocabulary unit returned by the segmentation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationItem {
    pub text: String,
    pub jyutping: String,
    pub part_of_speech: String,
}

/// One saved translation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub id: String,
    pub original_text: String,
    pub results: Vec<TranslationItem>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl TranslationRecord {
    /// Creates a record with a fresh id stamped with the current time.
    pub fn new(original_text: impl Into<String>, results: Vec<TranslationItem>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_text: original_text.into(),
            results,
            timestamp: now_millis(),
        }
    }
}

/// A colloquial alternative shown in the suggestion modal. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub text: String,
    pub jyutping: String,
    pub explanation: String,
}

impl SuggestionItem {
    pub fn to_translation_item(&self) -> TranslationItem {
        TranslationItem {
            text: self.text.clone(),
            jyutping: self.jyutping.clone(),
            part_of_speech: COLLOQUIAL_PART_OF_SPEECH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Translate,
    History,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Translate => "translate",
            View::History => "history",
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
