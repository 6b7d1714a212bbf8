pub mod feed_client;
pub mod refresh;
pub mod service;

pub use feed_client::{FeedClient, FetchError};
pub use refresh::RefreshTask;
pub use service::{CalendarFeedService, ServiceError};
