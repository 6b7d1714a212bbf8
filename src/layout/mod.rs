pub mod grouping;
pub mod overlap;
pub mod period;

pub use grouping::group_by_day;
pub use overlap::{assign_columns, LayoutAssignment, COLUMN_GAP_PCT, FULL_WIDTH};
pub use period::{filter_to_window, Period};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::CalendarEvent;

/// An event plus its horizontal placement for one day lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedEvent {
    pub event: CalendarEvent,
    pub layout: LayoutAssignment,
}

/// What the rendering layer consumes: a day-keyed map of placed events.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RenderPlan {
    pub days: BTreeMap<NaiveDate, Vec<PositionedEvent>>,
}

/// Window, group, and place a parsed occurrence list for rendering.
pub fn build_render_plan(
    events: Vec<CalendarEvent>,
    period: Period,
    today: NaiveDate,
) -> RenderPlan {
    let (window_start, window_end) = period.window(today);
    let filtered = filter_to_window(events, window_start, window_end);
    let grouped = group_by_day(&filtered);

    let days = grouped
        .into_iter()
        .map(|(date, day_events)| {
            let assignments = assign_columns(&day_events);
            let positioned = day_events
                .into_iter()
                .map(|event| {
                    let layout = assignments.get(&event.id).copied().unwrap_or(FULL_WIDTH);
                    PositionedEvent { event, layout }
                })
                .collect();
            (date, positioned)
        })
        .collect();

    RenderPlan { days }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventStatus, EventTime};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn timed(id: &str, day: u32, start_h: u32, end_h: u32) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: id.to_string(),
            description: None,
            location: None,
            start: EventTime::Timed {
                date_time: Utc.with_ymd_and_hms(2025, 6, day, start_h, 0, 0).unwrap(),
                time_zone: None,
            },
            end: EventTime::Timed {
                date_time: Utc.with_ymd_and_hms(2025, 6, day, end_h, 0, 0).unwrap(),
                time_zone: None,
            },
            status: EventStatus::Confirmed,
            organizer: None,
            attendees: vec![],
            link: None,
        }
    }

    #[test]
    fn empty_input_yields_empty_plan() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        let plan = build_render_plan(Vec::new(), Period::Week, today);

        assert_eq!(plan, RenderPlan::default());
    }

    #[test]
    fn plan_windows_groups_and_places_events() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let events = vec![
            timed("a", 16, 9, 10),
            timed("b", 16, 9, 10),
            timed("outside", 30, 9, 10),
        ];

        let plan = build_render_plan(events, Period::OneDay, today);

        assert_eq!(plan.days.len(), 1);
        let day = &plan.days[&today];
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].layout.width, 48.0);
        assert_eq!(day[1].layout.width, 48.0);
        assert!(day[0].layout.left != day[1].layout.left);
    }

    #[test]
    fn multi_day_event_is_placed_on_each_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let mut spanning = timed("span", 16, 22, 23);
        spanning.end = EventTime::Timed {
            date_time: Utc.with_ymd_and_hms(2025, 6, 17, 2, 0, 0).unwrap(),
            time_zone: None,
        };

        let plan = build_render_plan(vec![spanning], Period::ThreeDays, today);

        assert_eq!(plan.days.len(), 2);
    }
}
