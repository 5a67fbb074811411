use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error, warn};

use crate::model::{SuggestionItem, TranslationItem};
use crate::providers::{Provider, ProviderResponse};
use crate::translations::{self, SUGGESTION_TEMPERATURE, TRANSLATION_TEMPERATURE};

/// The only error a translation reports: callers cannot tell a network
/// failure from a malformed response.
#[derive(Debug, thiserror::Error)]
#[error("translation failed: {0}")]
pub struct TranslateError(String);

impl TranslateError {
    pub fn new(err: anyhow::Error) -> Self {
        Self(format!("{:#}", err))
    }
}

pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the app needs from a language model.
pub trait LanguageService {
    fn translate<'a>(
        &'a self,
        text: &'a str,
    ) -> ServiceFuture<'a, Result<Vec<TranslationItem>, TranslateError>>;

    /// Best-effort; failures come back as an empty list.
    fn suggest<'a>(&'a self, word: &'a str) -> ServiceFuture<'a, Vec<SuggestionItem>>;
}

#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: P,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn translate_to_cantonese(
        &self,
        input_text: &str,
    ) -> Result<Vec<TranslationItem>, TranslateError> {
        self.request_items(input_text).await.map_err(|err| {
            error!("translation error: {:#}", err);
            TranslateError::new(err)
        })
    }

    pub async fn colloquial_suggestions(&self, word: &str) -> Vec<SuggestionItem> {
        match self.request_suggestions(word).await {
            Ok(suggestions) => suggestions,
            Err(err) => {
                warn!("suggestion error for '{}': {:#}", word, err);
                Vec::new()
            }
        }
    }

    async fn request_items(&self, input_text: &str) -> Result<Vec<TranslationItem>> {
        let prompt = translations::render_translation_prompt(input_text)?;
        let response = self
            .provider
            .clone()
            .with_response_schema(translations::translation_schema())
            .with_temperature(TRANSLATION_TEMPERATURE)
            .append_user_input(prompt)
            .generate()
            .await?;
        let text = response_text(response)?;
        translations::parse_translation_items(&text)
    }

    async fn request_suggestions(&self, word: &str) -> Result<Vec<SuggestionItem>> {
        let prompt = translations::render_suggestion_prompt(word)?;
        let response = self
            .provider
            .clone()
            .with_response_schema(translations::suggestion_schema())
            .with_temperature(SUGGESTION_TEMPERATURE)
            .append_user_input(prompt)
            .generate()
            .await?;
        let text = response_text(response)?;
        translations::parse_suggestions(&text)
    }
}

impl<P: Provider> LanguageService for Translator<P> {
    fn translate<'a>(
        &'a self,
        text: &'a str,
    ) -> ServiceFuture<'a, Result<Vec<TranslationItem>, TranslateError>> {
        Box::pin(self.translate_to_cantonese(text))
    }

    fn suggest<'a>(&'a self, word: &'a str) -> ServiceFuture<'a, Vec<SuggestionItem>> {
        Box::pin(self.colloquial_suggestions(word))
    }
}

fn response_text(response: ProviderResponse) -> Result<String> {
    if let Some(model) = &response.model {
        debug!("response from {}", model);
    }
    response
        .text
        .ok_or_else(|| anyhow!("no response text from model"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderFuture, ResponseSchema};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Default)]
    struct Captured {
        inputs: Vec<String>,
        schema: Option<String>,
        temperature: Option<f32>,
    }

    /// Replays a canned reply and records how it was configured.
    #[derive(Debug, Clone)]
    struct StubProvider {
        reply: Result<Option<String>, String>,
        pending: Captured,
        captured: Arc<Mutex<Captured>>,
    }

    impl StubProvider {
        fn replying(text: Option<&str>) -> Self {
            Self {
                reply: Ok(text.map(str::to_string)),
                pending: Captured::default(),
                captured: Arc::new(Mutex::new(Captured::default())),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                ..Self::replying(None)
            }
        }
    }

    impl Provider for StubProvider {
        fn append_user_input(mut self, input: String) -> Self {
            self.pending.inputs.push(input);
            self
        }

        fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
            self.pending.schema = Some(schema.name);
            self
        }

        fn with_temperature(mut self, temperature: f32) -> Self {
            self.pending.temperature = Some(temperature);
            self
        }

        fn generate(self) -> ProviderFuture {
            *self.captured.lock().unwrap() = self.pending.clone();
            let reply = self.reply.clone();
            Box::pin(async move {
                match reply {
                    Ok(text) => Ok(ProviderResponse {
                        text,
                        model: Some("stub".to_string()),
                        usage: None,
                    }),
                    Err(message) => Err(anyhow!(message)),
                }
            })
        }
    }

    #[tokio::test]
    async fn unspaced_phrase_comes_back_as_one_item() {
        let provider = StubProvider::replying(Some(
            r#"{"items":[{"text":"身體健康","jyutping":"san1 tai2 gin6 hong1","partOfSpeech":"Idiom"}]}"#,
        ));
        let captured = provider.captured.clone();
        let translator = Translator::new(provider);

        let items = translator.translate_to_cantonese("身體健康").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "身體健康");

        let captured = captured.lock().unwrap().clone();
        assert_eq!(captured.schema.as_deref(), Some("vocabulary_items"));
        assert_eq!(captured.temperature, Some(TRANSLATION_TEMPERATURE));
        assert!(captured.inputs[0].contains("\"身體健康\""));
    }

    #[tokio::test]
    async fn missing_text_is_a_translation_error() {
        let translator = Translator::new(StubProvider::replying(None));
        let err = translator.translate_to_cantonese("食飯").await.unwrap_err();
        assert!(err.to_string().contains("no response text"));
    }

    #[tokio::test]
    async fn remote_failure_is_a_translation_error() {
        let translator = Translator::new(StubProvider::failing("connection reset"));
        let err = translator.translate("食飯").await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_translation_error() {
        let translator = Translator::new(StubProvider::replying(Some("[1, 2")));
        assert!(translator.translate_to_cantonese("食飯").await.is_err());
    }

    #[tokio::test]
    async fn suggestions_use_their_own_schema() {
        let provider = StubProvider::replying(Some(
            r#"{"suggestions":[{"text":"食飯","jyutping":"sik6 faan6","explanation":"Standard spoken"},{"text":"食嘢","jyutping":"sik6 je5","explanation":"Eat something"}]}"#,
        ));
        let captured = provider.captured.clone();
        let translator = Translator::new(provider);

        let suggestions = translator.suggest("吃飯").await;
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[1].text, "食嘢");

        let captured = captured.lock().unwrap().clone();
        assert_eq!(captured.schema.as_deref(), Some("colloquial_suggestions"));
        assert_eq!(captured.temperature, Some(SUGGESTION_TEMPERATURE));
    }

    #[tokio::test]
    async fn suggestion_failures_are_empty() {
        let translator = Translator::new(StubProvider::failing("quota"));
        assert!(translator.colloquial_suggestions("老師").await.is_empty());
        let translator = Translator::new(StubProvider::replying(Some("nonsense")));
        assert!(translator.colloquial_suggestions("老師").await.is_empty());
    }
}
