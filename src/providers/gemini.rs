use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Provider, ProviderFuture, ProviderResponse, ProviderUsage, ResponseSchema};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const BASE_URL_ENV: &str = "GEMINI_BASE_URL";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct Gemini {
    key: String,
    model: String,
    user_inputs: Vec<String>,
    schema: Option<ResponseSchema>,
    temperature: Option<f32>,
}

impl Gemini {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            user_inputs: Vec::new(),
            schema: None,
            temperature: None,
        }
    }

    fn request_body(&self) -> Value {
        let parts = self
            .user_inputs
            .iter()
            .map(|text| json!({ "text": text }))
            .collect::<Vec<_>>();
        let mut generation_config = json!({});
        if let Some(schema) = &self.schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.schema.clone();
        }
        if let Some(temperature) = self.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": parts
                }
            ],
            "generationConfig": generation_config
        })
    }
}

impl Provider for Gemini {
    fn append_user_input(mut self, input: String) -> Self {
        self.user_inputs.push(input);
        self
    }

    fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            let base_url = std::env::var(BASE_URL_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| BASE_URL.to_string());
            let url = format!(
                "{}/{}:generateContent",
                base_url.trim_end_matches('/'),
                self.model
            );
            let body = self.request_body();
            if let Some(schema) = &self.schema {
                debug!("requesting {} from {}", schema.name, self.model);
            }

            let response = reqwest::Client::new()
                .post(&url)
                .header("x-goog-api-key", self.key.clone())
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!(
                    "Gemini API error ({}): {}",
                    status,
                    extract_gemini_error(&text).unwrap_or(text)
                ));
            }
            extract_text_response(&text, &self.model)
        })
    }
}

fn extract_text_response(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, anyhow::Error> {
    let payload: GeminiResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Gemini response JSON: {}", err))?;

    let output = payload
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .filter(|value| !value.trim().is_empty());

    let model = payload
        .model_version
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage_metadata.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });
    if let Some(usage) = &usage {
        debug!(
            "Gemini usage: prompt={:?} completion={:?} total={:?}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    Ok(ProviderResponse {
        text: output,
        model,
        usage,
    })
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let mut parts = Vec::new();
    if let Some(message) = error.message.filter(|value| !value.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(status) = error.status.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("type: {}", status));
    }
    if let Some(code) = error.code {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        Some("unknown error".to_string())
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
