use thiserror::Error;

#[derive(Debug, Error)]
pub enum DualcastError {
    #[error("content store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("content store rejected request: {0}")]
    StoreRejected(String),
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("recipient not connected: {0}")]
    ChannelUnavailable(String),
    #[error("live channel failure: {0}")]
    ChannelFailed(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl DualcastError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::StoreRejected(_) => "store_rejected",
            Self::NotFound(_) => "not_found",
            Self::ChannelUnavailable(_) => "channel_unavailable",
            Self::ChannelFailed(_) => "channel_failed",
            Self::Validation(_) => "validation_error",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Http(_) => "http",
            Self::Serialization(_) => "serialization",
            Self::Runtime(_) => "runtime",
        }
    }
}

pub type Result<T> = std::result::Result<T, DualcastError>;
