use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::model::TranslationRecord;

/// The local UTC offset, or UTC when it cannot be determined.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Short day-month-time form, e.g. `19 Oct, 03:45 pm`.
pub fn format_date(timestamp_ms: i64, offset: UtcOffset) -> String {
    let format = format_description!(
        "[day padding:none] [month repr:short], [hour repr:12]:[minute] [period case:lower]"
    );
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000)
        .ok()
        .and_then(|datetime| datetime.to_offset(offset).format(format).ok())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Records whose original text or formatted date contains `query`,
/// ignoring case. A blank query matches everything.
pub fn filter_history<'a>(
    records: &'a [TranslationRecord],
    query: &str,
    offset: UtcOffset,
) -> Vec<&'a TranslationRecord> {
    let query = query.trim().to_lowercase();
    records
        .iter()
        .filter(|record| {
            if query.is_empty() {
                return true;
            }
            let date = format_date(record.timestamp, offset).to_lowercase();
            let text = record.original_text.to_lowercase();
            text.contains(&query) || date.contains(&query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn millis(datetime: OffsetDateTime) -> i64 {
        datetime.unix_timestamp() * 1000
    }

    fn record(id: &str, text: &str, timestamp: i64) -> TranslationRecord {
        TranslationRecord {
            id: id.to_string(),
            original_text: text.to_string(),
            results: Vec::new(),
            timestamp,
        }
    }

    #[test]
    fn formats_short_date() {
        let ts = millis(datetime!(2024-10-19 15:45 UTC));
        assert_eq!(format_date(ts, UtcOffset::UTC), "19 Oct, 03:45 pm");
        assert_eq!(format_date(ts, offset!(+8)), "19 Oct, 11:45 pm");
        assert_eq!(format_date(0, UtcOffset::UTC), "1 Jan, 12:00 am");
    }

    #[test]
    fn blank_query_keeps_everything() {
        let records = vec![record("a", "食飯", 0), record("b", "瞓覺", 0)];
        assert_eq!(filter_history(&records, "   ", UtcOffset::UTC).len(), 2);
    }

    #[test]
    fn matches_original_text() {
        let records = vec![
            record("a", "我想食飯", 0),
            record("b", "Hello 瞓覺", 0),
        ];
        let found = filter_history(&records, "HELLO", UtcOffset::UTC);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
    }

    #[test]
    fn matches_formatted_date_case_insensitively() {
        let records = vec![
            record("a", "食飯", millis(datetime!(2024-10-19 09:00 UTC))),
            record("b", "瞓覺", millis(datetime!(2024-11-02 09:00 UTC))),
            record("c", "飲茶", millis(datetime!(2024-10-03 21:30 UTC))),
        ];
        let ids = filter_history(&records, " OCT ", UtcOffset::UTC)
            .into_iter()
            .map(|record| record.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "c"]);

        let ids = filter_history(&records, "pm", UtcOffset::UTC)
            .into_iter()
            .map(|record| record.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["c"]);
    }
}
