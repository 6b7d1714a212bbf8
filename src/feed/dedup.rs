use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::calendar::CalendarEvent;
use crate::feed::parse::{OccurrenceKind, ParsedOccurrence};

/// Zone used to normalize occurrence keys. Inherited behavior: keys are
/// wall-clock renderings in this one zone, so a series declared in a
/// different zone can fail to deduplicate across a zone-offset boundary.
pub const REFERENCE_TZ: Tz = chrono_tz::Europe::Berlin;

/// Guarantees each original occurrence appears exactly once. Feeds sometimes
/// carry both a generated occurrence and an override for the same original
/// instant, or re-deliver overrides across fetches; the override always wins.
pub fn dedup_occurrences(parsed: Vec<ParsedOccurrence>) -> Vec<CalendarEvent> {
    let mut override_events: Vec<Option<CalendarEvent>> = Vec::new();
    let mut override_index: HashMap<(String, String), usize> = HashMap::new();

    for occurrence in &parsed {
        if let OccurrenceKind::Override { original } = occurrence.kind {
            let key = occurrence_key(&occurrence.series_uid, original);
            match override_index.get(&key) {
                // Re-delivered override for the same original: last one wins.
                Some(&slot) => override_events[slot] = Some(occurrence.event.clone()),
                None => {
                    override_index.insert(key, override_events.len());
                    override_events.push(Some(occurrence.event.clone()));
                }
            }
        }
    }

    let mut out = Vec::new();
    for occurrence in parsed {
        match occurrence.kind {
            OccurrenceKind::Single => out.push(occurrence.event),
            OccurrenceKind::Generated { original } => {
                let key = occurrence_key(&occurrence.series_uid, original);
                if !override_index.contains_key(&key) {
                    out.push(occurrence.event);
                }
            }
            OccurrenceKind::Override { .. } => {}
        }
    }
    out.extend(override_events.into_iter().flatten());
    out
}

fn occurrence_key(uid: &str, original: DateTime<Utc>) -> (String, String) {
    let wall_clock = original
        .with_timezone(&REFERENCE_TZ)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    (uid.to_string(), wall_clock)
}
