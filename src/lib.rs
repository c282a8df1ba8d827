pub mod client;
pub mod config;
pub mod daemon;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod providers;
pub mod scheduler;
pub mod services;

pub use crate::client::DualcastNode;
pub use crate::config::Config;
pub use crate::domains::delivery::{DeliveryResult, TransportKind, TransportOutcome};
pub use crate::domains::health::{Recommendation, TransportHealth};
pub use crate::domains::message::{Message, TransportMode};
pub use crate::error::{DualcastError, Result};
