use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domains::envelope::ContentId;
use crate::error::{DualcastError, Result};
use crate::interfaces::content_store::{ContentStore, NodeInfo};

/// In-process content-addressed store. Ids are derived from a SHA-256 of the
/// stored bytes, so identical bytes always map to the same id.
pub struct MemoryContentStore {
    objects: RwLock<HashMap<ContentId, Vec<u8>>>,
    pinned: RwLock<HashSet<ContentId>>,
    published: RwLock<Vec<(String, Vec<u8>)>>,
    reachable: AtomicBool,
    pubsub_enabled: AtomicBool,
    latency_ms: AtomicU64,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            pinned: RwLock::new(HashSet::new()),
            published: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
            pubsub_enabled: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn content_id_for(bytes: &[u8]) -> ContentId {
        ContentId::new(format!("bafy{}", hex::encode(Sha256::digest(bytes))))
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_pubsub_enabled(&self, enabled: bool) {
        self.pubsub_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_pinned(&self, cid: &ContentId) -> bool {
        self.pinned.read().await.contains(cid)
    }

    pub async fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.read().await.clone()
    }

    async fn enter(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(DualcastError::StoreUnavailable(
                "memory store marked unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn add(&self, bytes: Vec<u8>, filename: &str, pin: bool) -> Result<ContentId> {
        self.enter().await?;
        let cid = Self::content_id_for(&bytes);
        self.objects
            .write()
            .await
            .entry(cid.clone())
            .or_insert(bytes);
        if pin {
            self.pinned.write().await.insert(cid.clone());
        }
        debug!(%cid, filename, "stored object in memory");
        Ok(cid)
    }

    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>> {
        self.enter().await?;
        self.objects
            .read()
            .await
            .get(cid)
            .cloned()
            .ok_or_else(|| DualcastError::NotFound(cid.to_string()))
    }

    async fn publish(&self, topic: &str, bytes: Vec<u8>) -> Result<()> {
        self.enter().await?;
        if !self.pubsub_enabled.load(Ordering::SeqCst) {
            debug!(topic, "pubsub disabled; dropping publish");
            return Ok(());
        }
        self.published
            .write()
            .await
            .push((topic.to_string(), bytes));
        Ok(())
    }

    async fn node_info(&self) -> Result<NodeInfo> {
        self.enter().await?;
        Ok(NodeInfo {
            id: "memory-node".to_string(),
            agent_version: Some("dualcast-memory".to_string()),
            addresses: Vec::new(),
        })
    }

    async fn peers(&self) -> Result<Vec<String>> {
        self.enter().await?;
        Ok(Vec::new())
    }
}
