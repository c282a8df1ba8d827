use async_trait::async_trait;

use crate::domains::events::ChannelEvent;
use crate::error::Result;

#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Fails with `ChannelUnavailable` when the recipient has no open
    /// connection and `ChannelFailed` when the connection could not take the
    /// event.
    async fn send_to(&self, recipient_id: &str, event: ChannelEvent) -> Result<()>;

    /// Errors once the channel has stopped accepting connections.
    async fn connection_count(&self) -> Result<usize>;
}
