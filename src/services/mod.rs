pub mod daemon_client;
pub mod dispatcher;
pub mod envelope;
pub mod gateway;
pub mod health;
pub mod live_channel;
