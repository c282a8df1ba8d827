pub mod content_store;
pub mod live_channel;
pub mod scheduler;
