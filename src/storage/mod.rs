pub mod cache;
pub mod config;
pub mod store;

pub use cache::{CacheEntry, FeedCache, StaleRead};
pub use config::{Config, ConfigError, FeedSource};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
