use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domains::events::ChannelEvent;
use crate::error::{DualcastError, Result};
use crate::interfaces::live_channel::LiveChannel;

struct Connection {
    id: Uuid,
    tx: mpsc::Sender<ChannelEvent>,
}

pub struct ConnectionHandle {
    pub connection_id: Uuid,
    pub user_id: String,
    pub sender: mpsc::Sender<ChannelEvent>,
    pub receiver: mpsc::Receiver<ChannelEvent>,
}

/// Routes events to the open connection of each user. One connection per
/// user; a newer registration replaces the older one.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Connection>>,
    accepting: AtomicBool,
    send_timeout: Duration,
    queue_depth: usize,
}

impl ConnectionRegistry {
    pub fn new(send_timeout: Duration, queue_depth: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
            send_timeout,
            queue_depth: queue_depth.max(1),
        }
    }

    pub async fn register(&self, user_id: &str) -> Result<ConnectionHandle> {
        if !self.is_accepting() {
            return Err(DualcastError::ChannelFailed(
                "live channel is not accepting connections".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let connection_id = Uuid::new_v4();
        let replaced = self.connections.write().await.insert(
            user_id.to_string(),
            Connection {
                id: connection_id,
                tx: tx.clone(),
            },
        );
        if replaced.is_some() {
            info!(user_id, "replaced existing live connection");
        } else {
            info!(user_id, "live connection registered");
        }
        Ok(ConnectionHandle {
            connection_id,
            user_id: user_id.to_string(),
            sender: tx,
            receiver: rx,
        })
    }

    pub async fn unregister(&self, user_id: &str, connection_id: Uuid) -> bool {
        let mut guard = self.connections.write().await;
        match guard.get(user_id) {
            Some(conn) if conn.id == connection_id => {
                guard.remove(user_id);
                info!(user_id, "live connection closed");
                true
            }
            _ => false,
        }
    }

    pub async fn is_connected(&self, user_id: &str) -> bool {
        self.connections.read().await.contains_key(user_id)
    }

    pub async fn connected_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.connections.read().await.keys().cloned().collect();
        users.sort();
        users
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub async fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.connections.write().await.clear();
    }
}

#[async_trait]
impl LiveChannel for ConnectionRegistry {
    async fn send_to(&self, recipient_id: &str, event: ChannelEvent) -> Result<()> {
        let (connection_id, tx) = {
            let guard = self.connections.read().await;
            match guard.get(recipient_id) {
                Some(conn) => (conn.id, conn.tx.clone()),
                None => {
                    return Err(DualcastError::ChannelUnavailable(recipient_id.to_string()));
                }
            }
        };
        match tx.send_timeout(event, self.send_timeout).await {
            Ok(()) => {
                debug!(recipient_id, "event queued on live connection");
                Ok(())
            }
            Err(SendTimeoutError::Timeout(_)) => Err(DualcastError::ChannelFailed(format!(
                "send to {recipient_id} timed out after {:?}",
                self.send_timeout
            ))),
            Err(SendTimeoutError::Closed(_)) => {
                self.unregister(recipient_id, connection_id).await;
                Err(DualcastError::ChannelUnavailable(recipient_id.to_string()))
            }
        }
    }

    async fn connection_count(&self) -> Result<usize> {
        if !self.is_accepting() {
            return Err(DualcastError::ChannelFailed(
                "live channel is not accepting connections".to_string(),
            ));
        }
        Ok(self.connections.read().await.len())
    }
}
