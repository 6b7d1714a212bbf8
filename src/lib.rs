pub mod calendar;
pub mod feed;
pub mod layout;
pub mod storage;
pub mod sync;

pub use calendar::{CalendarEvent, EventStatus, EventTime};
pub use layout::{LayoutAssignment, Period, PositionedEvent, RenderPlan};
pub use sync::{CalendarFeedService, FeedClient, RefreshTask};
