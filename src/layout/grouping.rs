use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, NaiveTime};

use crate::calendar::{CalendarEvent, EventTime};

/// Corruption guard: no event may fan out over more than a year of days.
const MAX_SPAN_DAYS: usize = 366;

/// Buckets events into every civil day they touch. All-day ends are
/// exclusive; a timed end day counts only when the end instant has a nonzero
/// time-of-day on that day. An event that would land nowhere is force-placed
/// on its start day so nothing silently disappears.
pub fn group_by_day(events: &[CalendarEvent]) -> BTreeMap<NaiveDate, Vec<CalendarEvent>> {
    let mut days: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();

    for event in events {
        for day in days_touched(event) {
            days.entry(day).or_default().push(event.clone());
        }
    }
    days
}

fn days_touched(event: &CalendarEvent) -> Vec<NaiveDate> {
    let start_day = event.start.date_naive();
    let (end_day, include_end_day) = match &event.end {
        EventTime::AllDay { date } => (*date, false),
        EventTime::Timed { date_time, .. } => {
            (date_time.date_naive(), date_time.time() != NaiveTime::MIN)
        }
    };

    let mut touched = Vec::new();
    let mut day = start_day;
    for _ in 0..MAX_SPAN_DAYS {
        if day > end_day {
            break;
        }
        if day < end_day || include_end_day {
            touched.push(day);
        } else {
            break;
        }
        let Some(next) = day.checked_add_days(Days::new(1)) else {
            break;
        };
        day = next;
    }

    if touched.is_empty() {
        touched.push(start_day);
    }
    touched
}
