use std::collections::{HashMap, HashSet};
use std::io::BufReader;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use rrule::{RRule, Unvalidated};
use thiserror::Error;

use crate::calendar::{
    Attendee, AttendeeRole, CalendarEvent, EventStatus, EventTime, Organizer, ResponseStatus,
};

/// Hard cap on iterated occurrences per series, so an unbounded or
/// pathological rule always terminates.
const MAX_OCCURRENCES: usize = 2000;

const WINDOW_PAST_MONTHS: u32 = 12;
const WINDOW_FUTURE_MONTHS: u32 = 24;

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("Invalid calendar syntax: {0}")]
    Syntax(#[from] ical::parser::ParserError),
    #[error("Invalid recurrence rule: {0}")]
    Recurrence(#[from] rrule::RRuleError),
    #[error("Event {0} is missing {1}")]
    MissingProperty(String, &'static str),
    #[error("Invalid date/time value: {0}")]
    InvalidTime(String),
}

/// A parsed occurrence plus the series bookkeeping the deduplicator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOccurrence {
    pub series_uid: String,
    pub kind: OccurrenceKind,
    pub event: CalendarEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceKind {
    /// Non-recurring event.
    Single,
    /// Generated by expanding a recurrence rule; carries its own instant.
    Generated { original: DateTime<Utc> },
    /// Explicit exception; carries the instant of the occurrence it replaces.
    Override { original: DateTime<Utc> },
}

/// One logical series: the main definition plus any exception overrides,
/// grouped by UID. Transient parser state.
#[derive(Default)]
struct RecurrenceGroup {
    main: Option<IcalEvent>,
    overrides: Vec<IcalEvent>,
}

/// Parses feed text into concrete occurrences. Any parse failure degrades to
/// an empty list; a broken feed must never take the widget down.
pub fn parse_feed(text: &str, now: DateTime<Utc>) -> Vec<ParsedOccurrence> {
    match try_parse(text, now) {
        Ok(occurrences) => occurrences,
        Err(err) => {
            tracing::warn!("Discarding unparsable calendar feed: {}", err);
            Vec::new()
        }
    }
}

fn try_parse(text: &str, now: DateTime<Utc>) -> Result<Vec<ParsedOccurrence>, FeedParseError> {
    let window_start = now
        .checked_sub_months(Months::new(WINDOW_PAST_MONTHS))
        .unwrap_or(now);
    let window_end = now
        .checked_add_months(Months::new(WINDOW_FUTURE_MONTHS))
        .unwrap_or(now);

    // First-appearance order keeps output deterministic across parses.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, RecurrenceGroup> = HashMap::new();

    for calendar in ical::IcalParser::new(BufReader::new(text.as_bytes())) {
        let calendar = calendar?;
        for event in calendar.events {
            let Some(uid) = prop_value(&event, "UID").map(str::to_string) else {
                tracing::warn!("Skipping VEVENT without UID");
                continue;
            };
            let group = groups.entry(uid.clone()).or_insert_with(|| {
                order.push(uid.clone());
                RecurrenceGroup::default()
            });
            if prop(&event, "RECURRENCE-ID").is_some() {
                group.overrides.push(event);
            } else if group.main.is_none() {
                group.main = Some(event);
            } else {
                tracing::warn!("Duplicate main definition for series {}, keeping first", uid);
            }
        }
    }

    let mut out = Vec::new();
    for uid in order {
        let group = groups.remove(&uid).unwrap_or_default();
        expand_group(&uid, group, window_start, window_end, &mut out)?;
    }
    Ok(out)
}

fn expand_group(
    uid: &str,
    group: RecurrenceGroup,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    out: &mut Vec<ParsedOccurrence>,
) -> Result<(), FeedParseError> {
    // Overrides are emitted regardless of the window: an exception may move
    // an occurrence far outside the series' natural range.
    let mut override_instants = HashSet::new();
    let mut overrides = Vec::new();
    for entry in &group.overrides {
        let original_prop = prop(entry, "RECURRENCE-ID")
            .ok_or_else(|| FeedParseError::MissingProperty(uid.to_string(), "RECURRENCE-ID"))?;
        let original_time = parse_time_property(uid, original_prop)?;
        let original = original_time.instant();
        override_instants.insert(original);

        let id = format!("{}_except_{}", uid, format_instant(&original_time));
        let event = convert_event(uid, entry, id)?;
        overrides.push(ParsedOccurrence {
            series_uid: uid.to_string(),
            kind: OccurrenceKind::Override { original },
            event,
        });
    }

    if let Some(main) = &group.main {
        match prop_value(main, "RRULE") {
            None => {
                let event = convert_event(uid, main, uid.to_string())?;
                out.push(ParsedOccurrence {
                    series_uid: uid.to_string(),
                    kind: OccurrenceKind::Single,
                    event,
                });
            }
            Some(rule) => expand_recurring(
                uid,
                main,
                rule,
                &override_instants,
                window_start,
                window_end,
                out,
            )?,
        }
    }

    out.extend(overrides);
    Ok(())
}

fn expand_recurring(
    uid: &str,
    main: &IcalEvent,
    rule: &str,
    override_instants: &HashSet<DateTime<Utc>>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    out: &mut Vec<ParsedOccurrence>,
) -> Result<(), FeedParseError> {
    let template = convert_event(uid, main, uid.to_string())?;
    let start = template.start.clone();
    let duration = template.end.instant() - start.instant();

    // Expansion runs in UTC; the declared zone is carried on each occurrence
    // but does not shift the generated instants.
    let dtstart = rrule::Tz::UTC.from_utc_datetime(&start.instant().naive_utc());
    let parsed_rule: RRule<Unvalidated> = rule.parse()?;
    let mut set = parsed_rule.build(dtstart)?;
    for exdate in exdates(uid, main)? {
        set = set.exdate(rrule::Tz::UTC.from_utc_datetime(&exdate.naive_utc()));
    }

    for (iterations, occurrence) in set.into_iter().enumerate() {
        if iterations >= MAX_OCCURRENCES {
            tracing::warn!("Series {} hit the {} occurrence cap", uid, MAX_OCCURRENCES);
            break;
        }
        let occ_start = occurrence.with_timezone(&Utc);
        if occ_start > window_end {
            break;
        }
        if occ_start + duration < window_start {
            continue;
        }
        if override_instants.contains(&occ_start) {
            continue;
        }

        let (occ_start_time, occ_end_time) = occurrence_times(&template, occ_start, duration);
        let mut event = template.clone();
        event.id = format!("{}_{}", uid, occurrence_label(&occ_start_time));
        event.start = occ_start_time;
        event.end = occ_end_time;
        out.push(ParsedOccurrence {
            series_uid: uid.to_string(),
            kind: OccurrenceKind::Generated {
                original: occ_start,
            },
            event,
        });
    }
    Ok(())
}

/// Start/end for one generated occurrence, preserving the main definition's
/// all-day vs timed shape.
fn occurrence_times(
    template: &CalendarEvent,
    occ_start: DateTime<Utc>,
    duration: Duration,
) -> (EventTime, EventTime) {
    match (&template.start, &template.end) {
        (EventTime::AllDay { .. }, _) => {
            let start_date = occ_start.date_naive();
            let days = duration.num_days().max(1);
            let end_date = start_date + Duration::days(days);
            (
                EventTime::AllDay { date: start_date },
                EventTime::AllDay { date: end_date },
            )
        }
        (EventTime::Timed { time_zone, .. }, end) => {
            let end_zone = match end {
                EventTime::Timed { time_zone, .. } => time_zone.clone(),
                EventTime::AllDay { .. } => None,
            };
            (
                EventTime::Timed {
                    date_time: occ_start,
                    time_zone: time_zone.clone(),
                },
                EventTime::Timed {
                    date_time: occ_start + duration,
                    time_zone: end_zone,
                },
            )
        }
    }
}

fn exdates(uid: &str, event: &IcalEvent) -> Result<Vec<DateTime<Utc>>, FeedParseError> {
    let mut dates = Vec::new();
    for property in event.properties.iter().filter(|p| p.name.eq_ignore_ascii_case("EXDATE")) {
        let Some(raw) = property.value.as_deref() else {
            continue;
        };
        for value in raw.split(',') {
            let time = parse_time_value(uid, value.trim(), param(property, "TZID"))?;
            dates.push(time.instant());
        }
    }
    Ok(dates)
}

fn convert_event(uid: &str, event: &IcalEvent, id: String) -> Result<CalendarEvent, FeedParseError> {
    let start_prop = prop(event, "DTSTART")
        .ok_or_else(|| FeedParseError::MissingProperty(uid.to_string(), "DTSTART"))?;
    let start = parse_time_property(uid, start_prop)?;
    let end = match prop(event, "DTEND") {
        Some(end_prop) => parse_time_property(uid, end_prop)?,
        None => start.default_end(),
    };

    let status = match prop_value(event, "STATUS") {
        Some(v) if v.eq_ignore_ascii_case("TENTATIVE") => EventStatus::Tentative,
        Some(v) if v.eq_ignore_ascii_case("CANCELLED") => EventStatus::Cancelled,
        _ => EventStatus::Confirmed,
    };

    let organizer = prop(event, "ORGANIZER").and_then(|p| {
        Some(Organizer {
            email: mailto(p.value.as_deref()?)?.to_string(),
            display_name: param(p, "CN").map(str::to_string),
        })
    });

    let attendees = event
        .properties
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case("ATTENDEE"))
        .filter_map(parse_attendee)
        .collect();

    Ok(CalendarEvent {
        id,
        summary: prop_value(event, "SUMMARY").map(unescape_text).unwrap_or_default(),
        description: prop_value(event, "DESCRIPTION").map(unescape_text),
        location: prop_value(event, "LOCATION").map(unescape_text),
        start: start.into_event_time(),
        end: end.into_event_time(),
        status,
        organizer,
        attendees,
        link: prop_value(event, "URL").map(str::to_string),
    })
}

fn parse_attendee(property: &Property) -> Option<Attendee> {
    let email = mailto(property.value.as_deref()?)?.to_string();
    let response = match param(property, "PARTSTAT") {
        Some(v) if v.eq_ignore_ascii_case("ACCEPTED") => ResponseStatus::Accepted,
        Some(v) if v.eq_ignore_ascii_case("DECLINED") => ResponseStatus::Declined,
        Some(v) if v.eq_ignore_ascii_case("TENTATIVE") => ResponseStatus::Tentative,
        _ => ResponseStatus::NeedsAction,
    };
    let role = match param(property, "ROLE") {
        Some(v) if v.eq_ignore_ascii_case("CHAIR") => AttendeeRole::Chair,
        Some(v) if v.eq_ignore_ascii_case("OPT-PARTICIPANT") => AttendeeRole::Optional,
        Some(v) if v.eq_ignore_ascii_case("NON-PARTICIPANT") => AttendeeRole::NonParticipant,
        _ => AttendeeRole::Required,
    };
    Some(Attendee {
        email,
        display_name: param(property, "CN").map(str::to_string),
        response,
        role,
    })
}

/// A date-or-datetime feed value, pre-conversion.
enum FeedTime {
    Date(NaiveDate),
    Instant {
        utc: DateTime<Utc>,
        zone: Option<String>,
    },
}

impl FeedTime {
    fn instant(&self) -> DateTime<Utc> {
        match self {
            FeedTime::Date(date) => Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)),
            FeedTime::Instant { utc, .. } => *utc,
        }
    }

    fn into_event_time(self) -> EventTime {
        match self {
            FeedTime::Date(date) => EventTime::AllDay { date },
            FeedTime::Instant { utc, zone } => EventTime::Timed {
                date_time: utc,
                time_zone: zone,
            },
        }
    }

    /// DTEND fallback: one day for all-day events, zero length otherwise.
    fn default_end(&self) -> FeedTime {
        match self {
            FeedTime::Date(date) => FeedTime::Date(*date + Duration::days(1)),
            FeedTime::Instant { utc, zone } => FeedTime::Instant {
                utc: *utc,
                zone: zone.clone(),
            },
        }
    }
}

fn parse_time_property(uid: &str, property: &Property) -> Result<FeedTime, FeedParseError> {
    let raw = property
        .value
        .as_deref()
        .ok_or_else(|| FeedParseError::MissingProperty(uid.to_string(), "date value"))?;
    parse_time_value(uid, raw, param(property, "TZID"))
}

fn parse_time_value(uid: &str, raw: &str, tzid: Option<&str>) -> Result<FeedTime, FeedParseError> {
    let invalid = || FeedParseError::InvalidTime(format!("{} in series {}", raw, uid));

    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| invalid())?;
        return Ok(FeedTime::Date(date));
    }

    if let Some(stripped) = raw.strip_suffix('Z') {
        let naive =
            NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        return Ok(FeedTime::Instant {
            utc: Utc.from_utc_datetime(&naive),
            zone: None,
        });
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
    match tzid.and_then(|z| z.parse::<Tz>().ok()) {
        Some(tz) => {
            let local = tz
                .from_local_datetime(&naive)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive));
            Ok(FeedTime::Instant {
                utc: local.with_timezone(&Utc),
                zone: tzid.map(str::to_string),
            })
        }
        // Floating or unknown zone: treat as UTC but keep the label.
        None => Ok(FeedTime::Instant {
            utc: Utc.from_utc_datetime(&naive),
            zone: tzid.map(str::to_string),
        }),
    }
}

fn format_instant(time: &FeedTime) -> String {
    match time {
        FeedTime::Date(date) => date.format("%Y%m%d").to_string(),
        FeedTime::Instant { utc, .. } => utc.format("%Y%m%dT%H%M%SZ").to_string(),
    }
}

/// Id suffix for a generated occurrence: civil date for all-day series,
/// UTC instant otherwise.
fn occurrence_label(time: &EventTime) -> String {
    match time {
        EventTime::AllDay { date } => date.format("%Y%m%d").to_string(),
        EventTime::Timed { date_time, .. } => date_time.format("%Y%m%dT%H%M%SZ").to_string(),
    }
}

fn prop<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a Property> {
    event
        .properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

fn prop_value<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    prop(event, name).and_then(|p| p.value.as_deref())
}

fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|v| v.trim_matches('"'))
}

fn mailto(value: &str) -> Option<&str> {
    let email = value
        .strip_prefix("mailto:")
        .or_else(|| value.strip_prefix("MAILTO:"))
        .unwrap_or(value);
    if email.contains('@') { Some(email) } else { None }
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}
