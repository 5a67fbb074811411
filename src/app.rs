//! Session state for the translate and history views and the suggestion
//! modal. Front ends drive an [`App`] and render its state.

use time::UtcOffset;
use tracing::debug;

use crate::history;
use crate::model::{SuggestionItem, TranslationItem, TranslationRecord, View};
use crate::store::{HistoryStore, Storage, StoreError};
use crate::translator::LanguageService;

pub const TRANSLATE_ERROR_MESSAGE: &str = "Failed to translate. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalStatus {
    Loading,
    /// Suggestions arrived; empty when there were none or the fetch failed.
    Ready(Vec<SuggestionItem>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    Closed,
    Open {
        word: String,
        /// View that was active when the modal opened.
        origin: View,
        /// History record a kept suggestion is appended to.
        target_record: Option<String>,
        status: ModalStatus,
    },
}

pub struct App<S: Storage, L: LanguageService> {
    store: HistoryStore<S>,
    service: L,
    offset: UtcOffset,
    view: View,
    input_text: String,
    loading: bool,
    current_results: Option<Vec<TranslationItem>>,
    history_items: Vec<TranslationRecord>,
    history_search: String,
    error: Option<String>,
    modal: Modal,
}

impl<S: Storage, L: LanguageService> App<S, L> {
    pub fn new(store: HistoryStore<S>, service: L) -> Self {
        Self {
            store,
            service,
            offset: history::local_offset(),
            view: View::Translate,
            input_text: String::new(),
            loading: false,
            current_results: None,
            history_items: Vec::new(),
            history_search: String::new(),
            error: None,
            modal: Modal::Closed,
        }
    }

    /// Offset used when formatting and searching record dates.
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn current_results(&self) -> Option<&[TranslationItem]> {
        self.current_results.as_deref()
    }

    pub fn history_items(&self) -> &[TranslationRecord] {
        &self.history_items
    }

    pub fn history_search(&self) -> &str {
        &self.history_search
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn utc_offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn store(&self) -> &HistoryStore<S> {
        &self.store
    }

    /// Switches views. Entering the history view reloads it from storage and
    /// clears the search filter.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        if view == View::History {
            self.history_items = self.store.get_history();
            self.history_search.clear();
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.history_search = query.into();
    }

    pub fn filtered_history(&self) -> Vec<&TranslationRecord> {
        history::filter_history(&self.history_items, &self.history_search, self.offset)
    }

    /// Translates the current input and saves it to history. A failed
    /// translation sets [`TRANSLATE_ERROR_MESSAGE`] and keeps the input;
    /// only storage failures are returned.
    pub async fn translate(&mut self) -> Result<(), StoreError> {
        if self.loading || self.input_text.trim().is_empty() {
            return Ok(());
        }
        self.loading = true;
        self.error = None;
        self.current_results = None;

        let input = self.input_text.clone();
        let outcome = self.service.translate(&input).await;
        self.loading = false;

        match outcome {
            Ok(items) => {
                self.current_results = Some(items.clone());
                self.store.save_record(TranslationRecord::new(input, items))?;
            }
            Err(err) => {
                debug!("{}", err);
                self.error = Some(TRANSLATE_ERROR_MESSAGE.to_string());
            }
        }
        Ok(())
    }

    pub fn delete_history(&mut self, id: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete_record(id)?;
        self.history_items.retain(|record| record.id != id);
        Ok(removed)
    }

    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.store.clear_history()?;
        self.history_items.clear();
        Ok(())
    }

    /// Opens the modal for `word` and waits for its suggestions.
    pub async fn open_suggestions(&mut self, word: &str, target_record: Option<&str>) {
        self.modal = Modal::Open {
            word: word.to_string(),
            origin: self.view,
            target_record: target_record.map(str::to_string),
            status: ModalStatus::Loading,
        };
        let suggestions = self.service.suggest(word).await;
        if let Modal::Open { status, .. } = &mut self.modal {
            *status = ModalStatus::Ready(suggestions);
        }
    }

    pub fn suggestions(&self) -> Option<&[SuggestionItem]> {
        match &self.modal {
            Modal::Open {
                status: ModalStatus::Ready(suggestions),
                ..
            } => Some(suggestions),
            _ => None,
        }
    }

    /// Keeps `suggestion` as a colloquial item and closes the modal. It is
    /// appended to the current results when the modal was opened from the
    /// translate view, or to the target record when opened from history.
    pub fn add_suggestion(&mut self, suggestion: &SuggestionItem) -> Result<(), StoreError> {
        let (origin, target_record) = match &self.modal {
            Modal::Open {
                origin,
                target_record,
                ..
            } => (*origin, target_record.clone()),
            Modal::Closed => return Ok(()),
        };
        let item = suggestion.to_translation_item();

        match (origin, target_record) {
            (View::Translate, _) => {
                if let Some(results) = self.current_results.as_mut() {
                    results.push(item);
                }
            }
            (View::History, Some(id)) => {
                if let Some(record) = self.history_items.iter_mut().find(|record| record.id == id)
                {
                    let mut results = record.results.clone();
                    results.push(item);
                    self.store.update_record(&id, results.clone())?;
                    record.results = results;
                }
            }
            (View::History, None) => {}
        }

        self.modal = Modal::Closed;
        Ok(())
    }

    pub fn close_modal(&mut self) {
        self.modal = Modal::Closed;
    }
}
