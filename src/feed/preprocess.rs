use chrono::{DateTime, Months, Utc};

const BLOCK_BEGIN: &str = "BEGIN:VEVENT";
const BLOCK_END: &str = "END:VEVENT";

/// How far back a non-recurring entry may end before it is discarded.
const RETENTION_MONTHS: u32 = 6;

/// Drops old non-recurring VEVENT blocks from raw feed text so the parser
/// never has to chew through years of history. Recurring blocks are always
/// kept; their old occurrences are windowed during expansion instead.
///
/// Pure and idempotent. A block with no closing marker causes the remainder
/// of the text to be kept verbatim rather than truncated.
pub fn strip_stale_events(ics: &str, now: DateTime<Utc>) -> String {
    let Some(cutoff_date) = now.date_naive().checked_sub_months(Months::new(RETENTION_MONTHS))
    else {
        return ics.to_string();
    };
    let cutoff = cutoff_date.format("%Y%m%d").to_string();

    let mut out = String::with_capacity(ics.len());
    let mut rest = ics;

    loop {
        let Some(begin) = rest.find(BLOCK_BEGIN) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..begin]);
        let block_text = &rest[begin..];

        let Some(end) = block_text.find(BLOCK_END) else {
            // No closing marker: keep the tail untouched.
            out.push_str(block_text);
            break;
        };

        let mut stop = end + BLOCK_END.len();
        let bytes = block_text.as_bytes();
        if bytes.get(stop) == Some(&b'\r') {
            stop += 1;
        }
        if bytes.get(stop) == Some(&b'\n') {
            stop += 1;
        }

        let block = &block_text[..stop];
        if keep_block(block, &cutoff) {
            out.push_str(block);
        }
        rest = &block_text[stop..];
    }

    out
}

fn keep_block(block: &str, cutoff: &str) -> bool {
    if block.contains("RRULE") {
        return true;
    }
    match block_date(block, "DTEND").or_else(|| block_date(block, "DTSTART")) {
        // Fixed-width zero-padded YYYYMMDD, so lexical order is date order.
        Some(date) => date.as_str() >= cutoff,
        None => true,
    }
}

/// The `YYYYMMDD` prefix of the named property's value, if present.
fn block_date(block: &str, name: &str) -> Option<String> {
    for line in block.lines() {
        if !line.starts_with(name) {
            continue;
        }
        let Some(value) = line.splitn(2, ':').nth(1) else {
            continue;
        };
        let prefix: String = value.chars().take(8).collect();
        if prefix.len() == 8 && prefix.chars().all(|c| c.is_ascii_digit()) {
            return Some(prefix);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn event_block(body: &str) -> String {
        format!("BEGIN:VEVENT\r\n{}\r\nEND:VEVENT\r\n", body)
    }

    #[test]
    fn recent_single_event_is_kept() {
        let ics = event_block("UID:a\r\nDTSTART:20250610T090000Z\r\nDTEND:20250610T100000Z");

        assert_eq!(strip_stale_events(&ics, now()), ics);
    }

    #[test]
    fn old_single_event_is_dropped() {
        let old = event_block("UID:a\r\nDTSTART:20240101T090000Z\r\nDTEND:20240101T100000Z");
        let fresh = event_block("UID:b\r\nDTSTART:20250610T090000Z\r\nDTEND:20250610T100000Z");
        let ics = format!("{}{}", old, fresh);

        assert_eq!(strip_stale_events(&ics, now()), fresh);
    }

    #[test]
    fn old_recurring_event_is_kept() {
        let ics = event_block("UID:a\r\nDTSTART:20200101T090000Z\r\nRRULE:FREQ=WEEKLY");

        assert_eq!(strip_stale_events(&ics, now()), ics);
    }

    #[test]
    fn falls_back_to_dtstart_when_dtend_missing() {
        let old = event_block("UID:a\r\nDTSTART:20240101T090000Z");

        assert_eq!(strip_stale_events(&old, now()), "");
    }

    #[test]
    fn block_without_dates_is_kept() {
        let ics = event_block("UID:a\r\nSUMMARY:No dates here");

        assert_eq!(strip_stale_events(&ics, now()), ics);
    }

    #[test]
    fn unterminated_block_keeps_remainder_verbatim() {
        let ics = "BEGIN:VEVENT\r\nUID:a\r\nDTSTART:20200101T090000Z\r\n";

        assert_eq!(strip_stale_events(ics, now()), ics);
    }

    #[test]
    fn surrounding_calendar_text_is_preserved() {
        let old = event_block("UID:a\r\nDTEND:20240101T100000Z");
        let ics = format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{}END:VCALENDAR\r\n", old);

        assert_eq!(
            strip_stale_events(&ics, now()),
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n"
        );
    }

    #[test]
    fn preprocessing_is_idempotent() {
        let old = event_block("UID:a\r\nDTEND:20240101T100000Z");
        let fresh = event_block("UID:b\r\nDTEND:20250610T100000Z");
        let ics = format!("{}{}", old, fresh);

        let once = strip_stale_events(&ics, now());
        let twice = strip_stale_events(&once, now());

        assert_eq!(once, twice);
    }

    #[test]
    fn all_day_date_prefix_is_compared_lexically() {
        let old = event_block("UID:a\r\nDTSTART;VALUE=DATE:20240101\r\nDTEND;VALUE=DATE:20240102");
        let fresh = event_block("UID:b\r\nDTSTART;VALUE=DATE:20250620\r\nDTEND;VALUE=DATE:20250621");
        let ics = format!("{}{}", old, fresh);

        assert_eq!(strip_stale_events(&ics, now()), fresh);
    }
}
