use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One concrete occurrence as the widget renders it. Recurring series are
/// expanded before this type is constructed; `id` is unique within a single
/// rendered result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<Organizer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Either a civil date (all-day) or an absolute instant with the timezone the
/// feed declared it in. An event's start and end are always the same variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Timed {
        #[serde(rename = "dateTime")]
        date_time: DateTime<Utc>,
        #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
        time_zone: Option<String>,
    },
    AllDay { date: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub response: ResponseStatus,
    pub role: AttendeeRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendeeRole {
    Chair,
    Required,
    Optional,
    NonParticipant,
}

impl EventTime {
    /// Absolute instant for ordering and interval math. All-day values map to
    /// midnight UTC of their civil date.
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            EventTime::Timed { date_time, .. } => *date_time,
            EventTime::AllDay { date } => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        }
    }

    pub fn date_naive(&self) -> NaiveDate {
        match self {
            EventTime::Timed { date_time, .. } => date_time.date_naive(),
            EventTime::AllDay { date } => *date,
        }
    }
}

impl CalendarEvent {
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::AllDay { .. })
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.instant()
    }

    /// Exclusive end of the occupied interval. A degenerate end at or before
    /// the start still yields a non-empty interval so the event stays visible.
    pub fn end_instant(&self) -> DateTime<Utc> {
        let start = self.start.instant();
        let end = self.end.instant();
        if end > start {
            end
        } else {
            start + chrono::Duration::seconds(1)
        }
    }

    pub fn overlaps(&self, other: &CalendarEvent) -> bool {
        self.start_instant() < other.end_instant() && other.start_instant() < self.end_instant()
    }

    /// Attendee record matching the configured viewer identity, if any.
    /// Used only to highlight the viewer's response status.
    pub fn viewer_attendee(&self, viewer_email: &str) -> Option<&Attendee> {
        self.attendees
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(viewer_email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(date_time: DateTime<Utc>) -> EventTime {
        EventTime::Timed {
            date_time,
            time_zone: None,
        }
    }

    fn create_test_event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: "Test Event".to_string(),
            description: None,
            location: None,
            start: timed(start),
            end: timed(end),
            status: EventStatus::Confirmed,
            organizer: None,
            attendees: vec![],
            link: None,
        }
    }

    fn instant(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, h, m, 0).unwrap()
    }

    #[test]
    fn all_day_event_detected_from_start_variant() {
        let mut event = create_test_event("e1", instant(9, 0), instant(10, 0));
        assert!(!event.is_all_day());

        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        event.start = EventTime::AllDay { date };
        event.end = EventTime::AllDay {
            date: date.succ_opt().unwrap(),
        };
        assert!(event.is_all_day());
    }

    #[test]
    fn all_day_instant_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let time = EventTime::AllDay { date };

        assert_eq!(
            time.instant(),
            Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn events_overlap_when_intervals_intersect() {
        let a = create_test_event("a", instant(9, 0), instant(10, 0));
        let b = create_test_event("b", instant(9, 30), instant(10, 30));

        assert!(a.overlaps(&b));
    }

    #[test]
    fn adjacent_events_do_not_overlap() {
        let a = create_test_event("a", instant(9, 0), instant(10, 0));
        let b = create_test_event("b", instant(10, 0), instant(11, 0));

        assert!(!a.overlaps(&b));
    }

    #[test]
    fn degenerate_end_still_occupies_an_instant() {
        let a = create_test_event("a", instant(9, 0), instant(9, 0));

        assert!(a.end_instant() > a.start_instant());
    }

    #[test]
    fn viewer_attendee_matches_case_insensitively() {
        let mut event = create_test_event("e1", instant(9, 0), instant(10, 0));
        event.attendees.push(Attendee {
            email: "Viewer@Example.com".to_string(),
            display_name: None,
            response: ResponseStatus::Accepted,
            role: AttendeeRole::Required,
        });

        let found = event.viewer_attendee("viewer@example.com").unwrap();
        assert_eq!(found.response, ResponseStatus::Accepted);
        assert!(event.viewer_attendee("other@example.com").is_none());
    }

    #[test]
    fn timed_event_round_trips_through_json() {
        let event = create_test_event("e1", instant(9, 0), instant(10, 0));

        let json = serde_json::to_string(&event).unwrap();
        let back: CalendarEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back, event);
    }

    #[test]
    fn all_day_event_round_trips_through_json() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut event = create_test_event("e1", instant(0, 0), instant(0, 0));
        event.start = EventTime::AllDay { date };
        event.end = EventTime::AllDay {
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: CalendarEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back, event);
    }
}
