use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarEvent;

/// The widget's closed set of visible ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    OneDay,
    ThreeDays,
    FiveDays,
    Week,
    Month,
}

impl Period {
    /// Inclusive `[window_start, window_end]` civil-date window around
    /// `today`. Month pads one week on each side so partial calendar-grid
    /// rows stay populated.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::OneDay => (today, today),
            Period::ThreeDays => (today, add_days(today, 2)),
            Period::FiveDays => (today, add_days(today, 4)),
            Period::Week => {
                let monday = week_start(today);
                (monday, add_days(monday, 6))
            }
            Period::Month => {
                let first = today.with_day(1).unwrap_or(today);
                let last = first
                    .checked_add_months(Months::new(1))
                    .and_then(|d| d.checked_sub_days(Days::new(1)))
                    .unwrap_or(today);
                (
                    first.checked_sub_days(Days::new(7)).unwrap_or(first),
                    add_days(last, 7),
                )
            }
        }
    }
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let from_monday = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(from_monday)).unwrap_or(date)
}

/// Events whose `[start, end)` intersects the window, sorted chronologically
/// by start instant.
pub fn filter_to_window(
    events: Vec<CalendarEvent>,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<CalendarEvent> {
    let start = Utc.from_utc_datetime(&window_start.and_time(NaiveTime::MIN));
    let end = Utc.from_utc_datetime(&window_end.and_time(NaiveTime::MIN)) + Duration::days(1);

    let mut filtered: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|e| e.start_instant() < end && e.end_instant() > start)
        .collect();
    filtered.sort_by_key(CalendarEvent::start_instant);
    filtered
}
