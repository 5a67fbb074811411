use time::UtcOffset;

use crate::history::format_date;
use crate::model::{SuggestionItem, TranslationItem, TranslationRecord};

pub fn format_items(items: &[TranslationItem]) -> String {
    if items.is_empty() {
        return "(no vocabulary items)".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            format!(
                "{}. {}\t{}\t[{}]",
                index + 1,
                item.text,
                item.jyutping,
                item.part_of_speech
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_record(index: usize, record: &TranslationRecord, offset: UtcOffset) -> String {
    let mut lines = vec![format!(
        "#{} {}\t{}\t{}",
        index + 1,
        format_date(record.timestamp, offset),
        record.original_text,
        record.id
    )];
    for item in &record.results {
        lines.push(format!(
            "    {}\t{}\t[{}]",
            item.text, item.jyutping, item.part_of_speech
        ));
    }
    lines.join("\n")
}

pub fn format_history(records: &[&TranslationRecord], offset: UtcOffset) -> String {
    if records.is_empty() {
        return "(no history)".to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(index, record)| format_record(index, record, offset))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_suggestions(suggestions: &[SuggestionItem]) -> String {
    if suggestions.is_empty() {
        return "(no suggestions)".to_string();
    }
    suggestions
        .iter()
        .enumerate()
        .map(|(index, item)| {
            format!(
                "{}. {}\t{}\t{}",
                index + 1,
                item.text,
                item.jyutping,
                item.explanation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
