pub mod dedup;
pub mod parse;
pub mod preprocess;

pub use dedup::REFERENCE_TZ;
pub use parse::{FeedParseError, OccurrenceKind, ParsedOccurrence};

use chrono::{DateTime, Utc};

use crate::calendar::CalendarEvent;

/// Full feed-text pipeline: strip stale blocks, expand recurrences, and
/// reconcile overrides. Fail-soft; a broken feed yields an empty list.
pub fn ingest_feed_text(text: &str, now: DateTime<Utc>) -> Vec<CalendarEvent> {
    let trimmed = preprocess::strip_stale_events(text, now);
    dedup::dedup_occurrences(parse::parse_feed(&trimmed, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn pipeline_strips_expands_and_reconciles() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\n\
            BEGIN:VEVENT\r\nUID:ancient\r\nSUMMARY:Old\r\nDTSTART:20200101T090000Z\r\nDTEND:20200101T100000Z\r\nEND:VEVENT\r\n\
            BEGIN:VEVENT\r\nUID:series\r\nSUMMARY:Weekly\r\nDTSTART:20250602T090000Z\r\nDTEND:20250602T100000Z\r\nRRULE:FREQ=WEEKLY;COUNT=2\r\nEND:VEVENT\r\n\
            BEGIN:VEVENT\r\nUID:series\r\nSUMMARY:Moved\r\nRECURRENCE-ID:20250609T090000Z\r\nDTSTART:20250609T140000Z\r\nDTEND:20250609T150000Z\r\nEND:VEVENT\r\n\
            END:VCALENDAR\r\n";
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

        let events = ingest_feed_text(ics, now);

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["series_20250602T090000Z", "series_except_20250609T090000Z"]
        );
    }
}
