use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ContentStoreConfig;
use crate::domains::envelope::ContentId;
use crate::error::{DualcastError, Result};
use crate::interfaces::content_store::{ContentStore, NodeInfo};

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "AgentVersion")]
    agent_version: Option<String>,
    #[serde(rename = "Addresses")]
    addresses: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct SwarmPeer {
    #[serde(rename = "Peer")]
    peer: String,
}

#[derive(Deserialize)]
struct SwarmPeersResponse {
    #[serde(rename = "Peers")]
    peers: Option<Vec<SwarmPeer>>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "Message")]
    message: String,
}

/// Client for a Kubo-compatible RPC API (`/api/v0/...`).
pub struct IpfsContentStore {
    client: reqwest::Client,
    api_url: String,
    pubsub_enabled: bool,
}

impl IpfsContentStore {
    pub fn new(config: &ContentStoreConfig) -> Result<Self> {
        let trimmed = config.api_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| DualcastError::Config(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DualcastError::Config(format!(
                "unsupported content store scheme '{}'",
                parsed.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| DualcastError::Config(e.to_string()))?;
        Ok(Self {
            client,
            api_url: trimmed.to_string(),
            pubsub_enabled: config.pubsub_enabled(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn call(
        &self,
        command: &str,
        query: &[(&str, String)],
        form: Option<Form>,
    ) -> Result<Response> {
        let url = format!("{}/api/v0/{}", self.api_url, command);
        let mut request = self.client.post(url).query(query);
        if let Some(form) = form {
            request = request.multipart(form);
        }
        request.send().await.map_err(unavailable)
    }

    async fn expect_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = error_message(response).await;
        Err(DualcastError::StoreRejected(format!("{status}: {message}")))
    }
}

fn unavailable(err: reqwest::Error) -> DualcastError {
    if err.is_timeout() {
        DualcastError::StoreUnavailable(format!("request timed out: {err}"))
    } else {
        DualcastError::StoreUnavailable(err.to_string())
    }
}

async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiError>(&text)
        .map(|err| err.message)
        .unwrap_or(text)
}

fn is_missing_content(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("not found") || lower.contains("no link named")
}

fn is_pubsub_disabled(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("pubsub") && (lower.contains("not enabled") || lower.contains("experimental"))
}

/// Kubo expects pub/sub topics as multibase base64url (`u` prefix).
pub fn encode_topic(topic: &str) -> String {
    format!("u{}", URL_SAFE_NO_PAD.encode(topic.as_bytes()))
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    async fn add(&self, bytes: Vec<u8>, filename: &str, pin: bool) -> Result<ContentId> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        let response = self
            .call("add", &[("pin", pin.to_string())], Some(form))
            .await?;
        let response = Self::expect_success(response).await?;
        let body = response.text().await.map_err(unavailable)?;
        let line = body
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| DualcastError::StoreRejected("empty add response".to_string()))?;
        let parsed: AddResponse = serde_json::from_str(line)
            .map_err(|e| DualcastError::StoreRejected(format!("unexpected add response: {e}")))?;
        debug!(cid = %parsed.hash, filename, "content added");
        Ok(ContentId::new(parsed.hash))
    }

    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>> {
        let response = self
            .call("cat", &[("arg", cid.as_str().to_string())], None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DualcastError::NotFound(cid.to_string()));
        }
        match Self::expect_success(response).await {
            Ok(response) => {
                let bytes = response.bytes().await.map_err(unavailable)?;
                Ok(bytes.to_vec())
            }
            Err(DualcastError::StoreRejected(message)) if is_missing_content(&message) => {
                Err(DualcastError::NotFound(cid.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    async fn publish(&self, topic: &str, bytes: Vec<u8>) -> Result<()> {
        if !self.pubsub_enabled {
            debug!(topic, "pubsub disabled in config; skipping publish");
            return Ok(());
        }
        let form = Form::new().part("file", Part::bytes(bytes).file_name("data".to_string()));
        let response = self
            .call("pubsub/pub", &[("arg", encode_topic(topic))], Some(form))
            .await?;
        match Self::expect_success(response).await {
            Ok(_) => Ok(()),
            Err(DualcastError::StoreRejected(message)) if is_pubsub_disabled(&message) => {
                warn!(topic, %message, "pubsub not enabled on content store; skipping publish");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn node_info(&self) -> Result<NodeInfo> {
        let response = Self::expect_success(self.call("id", &[], None).await?).await?;
        let parsed: IdResponse = response
            .json()
            .await
            .map_err(|e| DualcastError::StoreRejected(format!("unexpected id response: {e}")))?;
        Ok(NodeInfo {
            id: parsed.id,
            agent_version: parsed.agent_version,
            addresses: parsed.addresses.unwrap_or_default(),
        })
    }

    async fn peers(&self) -> Result<Vec<String>> {
        let response = Self::expect_success(self.call("swarm/peers", &[], None).await?).await?;
        let parsed: SwarmPeersResponse = response.json().await.map_err(|e| {
            DualcastError::StoreRejected(format!("unexpected swarm/peers response: {e}"))
        })?;
        Ok(parsed
            .peers
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.peer)
            .collect())
    }
}
