use std::env;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};

use dashcal::calendar::ResponseStatus;
use dashcal::layout::{Period, PositionedEvent, RenderPlan};
use dashcal::storage::cache::FeedCache;
use dashcal::storage::config::Config;
use dashcal::storage::store::{KeyValueStore, MemoryStore, SqliteStore};
use dashcal::sync::feed_client::FeedClient;
use dashcal::sync::service::CalendarFeedService;

#[derive(Clone, Copy)]
pub struct CliOptions {
    pub date: Option<NaiveDate>,
    pub period: Option<Period>,
    pub force: bool,
}

pub fn parse_cli_options() -> Result<CliOptions, String> {
    let mut options = CliOptions {
        date: None,
        period: None,
        force: false,
    };
    let mut args = env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--refresh" => {
                options.force = true;
            }
            "--date" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--date requires a value".to_string())?;
                let date = NaiveDate::parse_from_str(&value, "%Y/%m/%d")
                    .map_err(|_| format!("Invalid date '{}'. Use YYYY/MM/DD.", value))?;
                options.date = Some(date);
            }
            "--period" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--period requires a value".to_string())?;
                options.period = Some(parse_period(&value)?);
            }
            "--help" => {
                println!("Usage: dashcal [--date YYYY/MM/DD] [--period 1|3|5|week|month] [--refresh]");
                std::process::exit(0);
            }
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(options)
}

fn parse_period(value: &str) -> Result<Period, String> {
    match value {
        "1" => Ok(Period::OneDay),
        "3" => Ok(Period::ThreeDays),
        "5" => Ok(Period::FiveDays),
        "week" => Ok(Period::Week),
        "month" => Ok(Period::Month),
        other => Err(format!(
            "Invalid period '{}'. Use 1, 3, 5, week or month.",
            other
        )),
    }
}

pub async fn run(options: CliOptions) -> anyhow::Result<()> {
    let config = Config::load_or_create().context("loading config")?;
    config.validate().context("validating config")?;

    let store: Arc<dyn KeyValueStore> = match SqliteStore::open(&config.cache.db_path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::warn!("Falling back to in-memory cache: {}", err);
            Arc::new(MemoryStore::new())
        }
    };

    let service = CalendarFeedService::new(
        FeedClient::new(),
        FeedCache::new(store, config.freshness()),
        config.freshness(),
    );

    let today = options.date.unwrap_or_else(|| Local::now().date_naive());
    let period = options.period.unwrap_or(config.view.period);

    let plan = service
        .render_plan(config.feed_url(), period, today, options.force)
        .await
        .context("building render plan")?;

    print!(
        "{}",
        format_plan_text(&plan, config.view.viewer_email.as_deref())
    );
    Ok(())
}

fn format_plan_text(plan: &RenderPlan, viewer_email: Option<&str>) -> String {
    let mut lines = Vec::new();

    if plan.days.is_empty() {
        lines.push("No events scheduled.".to_string());
    }
    for (date, events) in &plan.days {
        lines.push(date.format("%A, %B %d, %Y").to_string());
        for positioned in events {
            lines.push(format!("  {}", build_event_line(positioned, viewer_email)));
        }
        lines.push(String::new());
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn build_event_line(positioned: &PositionedEvent, viewer_email: Option<&str>) -> String {
    let event = &positioned.event;
    let time_label = if event.is_all_day() {
        "All Day".to_string()
    } else {
        format!(
            "{}-{}",
            event.start_instant().format("%H:%M"),
            event.end_instant().format("%H:%M")
        )
    };

    let mut line = format!("{:<13} {}", time_label, event.summary);
    if let Some(location) = &event.location
        && !location.is_empty()
    {
        line.push_str(&format!(" @ {}", location));
    }
    if positioned.layout.width < 100.0 {
        line.push_str(&format!(
            " [{:.0}% wide at {:.0}%]",
            positioned.layout.width, positioned.layout.left
        ));
    }
    if let Some(viewer) = viewer_email
        && let Some(attendee) = event.viewer_attendee(viewer)
    {
        let marker = match attendee.response {
            ResponseStatus::Accepted => "going",
            ResponseStatus::Declined => "declined",
            ResponseStatus::Tentative => "maybe",
            ResponseStatus::NeedsAction => "not responded",
        };
        line.push_str(&format!(" ({})", marker));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashcal::calendar::{Attendee, AttendeeRole, CalendarEvent, EventStatus, EventTime};
    use dashcal::layout::{LayoutAssignment, FULL_WIDTH};
    use chrono::{TimeZone, Utc};

    fn positioned(summary: &str, layout: LayoutAssignment) -> PositionedEvent {
        let start = Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap();
        PositionedEvent {
            event: CalendarEvent {
                id: summary.to_string(),
                summary: summary.to_string(),
                description: None,
                location: None,
                start: EventTime::Timed {
                    date_time: start,
                    time_zone: None,
                },
                end: EventTime::Timed {
                    date_time: start + chrono::Duration::hours(1),
                    time_zone: None,
                },
                status: EventStatus::Confirmed,
                organizer: None,
                attendees: vec![],
                link: None,
            },
            layout,
        }
    }

    #[test]
    fn full_width_events_omit_geometry() {
        let line = build_event_line(&positioned("Standup", FULL_WIDTH), None);

        assert!(line.contains("Standup"));
        assert!(!line.contains('%'));
    }

    #[test]
    fn narrowed_events_show_geometry() {
        let line = build_event_line(
            &positioned("Standup", LayoutAssignment { left: 52.0, width: 48.0 }),
            None,
        );

        assert!(line.contains("[48% wide at 52%]"));
    }

    #[test]
    fn viewer_response_is_marked() {
        let mut event = positioned("Sync", FULL_WIDTH);
        event.event.attendees.push(Attendee {
            email: "me@example.com".to_string(),
            display_name: None,
            response: ResponseStatus::Accepted,
            role: AttendeeRole::Required,
        });

        let line = build_event_line(&event, Some("me@example.com"));

        assert!(line.ends_with("(going)"));
    }

    #[test]
    fn empty_plan_prints_placeholder() {
        let text = format_plan_text(&RenderPlan::default(), None);

        assert_eq!(text, "No events scheduled.\n");
    }
}
