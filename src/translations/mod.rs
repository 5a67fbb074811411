use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tera::{Context as TeraContext, Tera};
use tracing::warn;

use crate::model::{SuggestionItem, TranslationItem};
use crate::providers::ResponseSchema;

pub const TRANSLATION_SCHEMA_NAME: &str = "vocabulary_items";
pub const SUGGESTION_SCHEMA_NAME: &str = "colloquial_suggestions";

/// Low: segmentation should be stable for the same input.
pub const TRANSLATION_TEMPERATURE: f32 = 0.1;
pub const SUGGESTION_TEMPERATURE: f32 = 0.4;

const TRANSLATE_PROMPT: &str = include_str!("prompts/translate_prompt.tera");
const SUGGESTION_PROMPT: &str = include_str!("prompts/suggestion_prompt.tera");

pub fn translation_schema() -> ResponseSchema {
    ResponseSchema {
        name: TRANSLATION_SCHEMA_NAME.to_string(),
        schema: json!({
            "type": "OBJECT",
            "properties": {
                "items": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "text": {
                                "type": "STRING",
                                "description": "The Traditional Chinese character(s) for the word."
                            },
                            "jyutping": {
                                "type": "STRING",
                                "description": "The LSHK Jyutping romanization (e.g., 'gwong2 dung1 waa2')."
                            },
                            "partOfSpeech": {
                                "type": "STRING",
                                "description": "The part of speech (e.g., Noun, Verb, Adj). If unsure, use 'General'."
                            }
                        },
                        "required": ["text", "jyutping", "partOfSpeech"]
                    }
                }
            },
            "required": ["items"]
        }),
    }
}

pub fn suggestion_schema() -> ResponseSchema {
    ResponseSchema {
        name: SUGGESTION_SCHEMA_NAME.to_string(),
        schema: json!({
            "type": "OBJECT",
            "properties": {
                "suggestions": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "text": {
                                "type": "STRING",
                                "description": "The Hong Kong Cantonese colloquial word/phrase."
                            },
                            "jyutping": {
                                "type": "STRING",
                                "description": "LSHK Jyutping."
                            },
                            "explanation": {
                                "type": "STRING",
                                "description": "Brief meaning or context usage."
                            }
                        },
                        "required": ["text", "jyutping", "explanation"]
                    }
                }
            },
            "required": ["suggestions"]
        }),
    }
}

pub fn render_translation_prompt(input_text: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("input_text", input_text);
    context.insert("schema_name", TRANSLATION_SCHEMA_NAME);
    Tera::one_off(TRANSLATE_PROMPT, &context, false)
        .with_context(|| "failed to render translation prompt")
}

pub fn render_suggestion_prompt(word: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("word", word);
    context.insert("schema_name", SUGGESTION_SCHEMA_NAME);
    Tera::one_off(SUGGESTION_PROMPT, &context, false)
        .with_context(|| "failed to render suggestion prompt")
}

#[derive(Debug, Deserialize)]
struct TranslationPayload {
    #[serde(default)]
    items: Vec<TranslationItem>,
}

#[derive(Debug, Deserialize)]
struct SuggestionPayload {
    #[serde(default)]
    suggestions: Vec<SuggestionItem>,
}

/// Parses the model's JSON text into vocabulary items. A missing `items`
/// field is an empty result; a missing field inside an item is an error.
pub fn parse_translation_items(text: &str) -> Result<Vec<TranslationItem>> {
    let payload: TranslationPayload =
        serde_json::from_str(text).with_context(|| "failed to parse translation response")?;
    Ok(payload
        .items
        .into_iter()
        .filter_map(|item| {
            let item = TranslationItem {
                text: item.text.trim().to_string(),
                jyutping: item.jyutping.trim().to_string(),
                part_of_speech: item.part_of_speech.trim().to_string(),
            };
            if item.text.is_empty() {
                warn!("dropping vocabulary item with empty text");
                return None;
            }
            Some(item)
        })
        .collect())
}

pub fn parse_suggestions(text: &str) -> Result<Vec<SuggestionItem>> {
    let payload: SuggestionPayload =
        serde_json::from_str(text).with_context(|| "failed to parse suggestion response")?;
    Ok(payload
        .suggestions
        .into_iter()
        .filter_map(|item| {
            let item = SuggestionItem {
                text: item.text.trim().to_string(),
                jyutping: item.jyutping.trim().to_string(),
                explanation: item.explanation.trim().to_string(),
            };
            if item.text.is_empty() {
                warn!("dropping suggestion with empty text");
                return None;
            }
            Some(item)
        })
        .collect())
}
