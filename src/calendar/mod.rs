pub mod event;

pub use event::{
    Attendee, AttendeeRole, CalendarEvent, EventStatus, EventTime, Organizer, ResponseStatus,
};
