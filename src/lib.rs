use anyhow::{Result, anyhow};
use std::path::Path;

pub mod app;
pub mod history;
pub mod logging;
pub mod model;
mod paths;
pub mod providers;
pub mod render;
pub mod settings;
pub mod speech;
pub mod store;
mod test_util;
pub mod translations;
pub mod translator;

pub use app::{App, Modal, ModalStatus, TRANSLATE_ERROR_MESSAGE};
pub use model::{SuggestionItem, TranslationItem, TranslationRecord, View};
pub use providers::{Gemini, Provider};
pub use speech::{SpeechError, Speaker};
pub use store::{FileStorage, HistoryStore, MemoryStorage, Storage, StoreError};
pub use translator::{LanguageService, TranslateError, Translator};

/// The app as wired for the command line: file-backed history and Gemini.
pub type CliApp = App<FileStorage, Translator<Gemini>>;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub suggest: Option<String>,
    pub show_histories: bool,
    pub search: Option<String>,
    pub delete_history: Option<String>,
    pub clear_histories: bool,
    pub speak: Option<String>,
}

pub struct Session {
    pub app: CliApp,
    pub speaker: Speaker,
    has_key: bool,
}

impl Session {
    pub fn has_key(&self) -> bool {
        self.has_key
    }

    pub fn require_key(&self) -> Result<()> {
        if self.has_key {
            return Ok(());
        }
        Err(anyhow!(
            "no API key found (checked --key, GEMINI_API_KEY, GOOGLE_API_KEY, API_KEY)"
        ))
    }
}

pub fn open_session(config: &Config) -> Result<Session> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let key = providers::resolve_key(config.key.as_deref());
    let store = HistoryStore::new(FileStorage::new(paths::storage_dir()))
        .with_limit(settings.history_limit);
    let has_key = key.is_some();
    let translator = Translator::new(Gemini::new(key.unwrap_or_default()));
    Ok(Session {
        app: App::new(store, translator),
        speaker: Speaker::new(&settings),
        has_key,
    })
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let mut session = open_session(&config)?;

    if let Some(text) = config.speak.as_deref() {
        session.speaker.speak(text)?;
        return Ok(String::new());
    }

    if config.clear_histories {
        session.app.clear_history()?;
        return Ok("history cleared".to_string());
    }

    if let Some(id) = config.delete_history.as_deref() {
        session.app.set_view(View::History);
        session.app.delete_history(id.trim())?;
        return Ok(render::format_history(
            &session.app.filtered_history(),
            session.app.utc_offset(),
        ));
    }

    if config.show_histories || config.search.is_some() {
        session.app.set_view(View::History);
        if let Some(query) = config.search {
            session.app.set_search(query);
        }
        return Ok(render::format_history(
            &session.app.filtered_history(),
            session.app.utc_offset(),
        ));
    }

    if let Some(word) = config.suggest.as_deref() {
        let word = word.trim();
        if word.is_empty() {
            return Err(anyhow!("word is empty"));
        }
        session.require_key()?;
        session.app.open_suggestions(word, None).await;
        let output = render::format_suggestions(session.app.suggestions().unwrap_or_default());
        session.app.close_modal();
        return Ok(output);
    }

    let input = input.unwrap_or_default();
    if input.trim().is_empty() {
        return Err(anyhow!("input is empty"));
    }
    session.require_key()?;
    session.app.set_input(input.trim_end_matches(['\r', '\n']));
    session.app.translate().await?;
    if let Some(message) = session.app.error() {
        return Err(anyhow!(message.to_string()));
    }
    Ok(render::format_items(
        session.app.current_results().unwrap_or_default(),
    ))
}
