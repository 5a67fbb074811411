use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

mod gemini;

pub use gemini::Gemini;

/// JSON schema the model output must satisfy.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Concatenated text parts of the first candidate, if any.
    pub text: Option<String>,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

/// A generative model endpoint, configured by value and consumed by `generate`.
pub trait Provider: Clone + Send + Sync {
    fn append_user_input(self, input: String) -> Self;
    fn with_response_schema(self, schema: ResponseSchema) -> Self;
    fn with_temperature(self, temperature: f32) -> Self;
    fn generate(self) -> ProviderFuture;
}

pub fn resolve_key(override_key: Option<&str>) -> Option<String> {
    if let Some(key) = override_key {
        if !key.trim().is_empty() {
            return Some(key.trim().to_string());
        }
    }
    get_env("GEMINI_API_KEY")
        .or_else(|| get_env("GOOGLE_API_KEY"))
        .or_else(|| get_env("API_KEY"))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
