use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::envelope::ContentId;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub agent_version: Option<String>,
    pub addresses: Vec<String>,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn add(&self, bytes: Vec<u8>, filename: &str, pin: bool) -> Result<ContentId>;
    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>>;
    async fn publish(&self, topic: &str, bytes: Vec<u8>) -> Result<()>;
    async fn node_info(&self) -> Result<NodeInfo>;
    async fn peers(&self) -> Result<Vec<String>>;
}
