pub mod delivery;
pub mod envelope;
pub mod events;
pub mod health;
pub mod message;
