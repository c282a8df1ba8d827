use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DualcastError, Result};

pub struct DaemonResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub struct DaemonClient {
    base_url: String,
    client: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(timeout)
            .build()
            .map_err(|e| DualcastError::Runtime(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json(&self, path: &str) -> Result<DaemonResponse> {
        let response = self
            .client
            .get(join_url(&self.base_url, path))
            .send()
            .await
            .map_err(|e| DualcastError::Http(e.to_string()))?;
        Self::read(response).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<DaemonResponse> {
        let response = self
            .client
            .post(join_url(&self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| DualcastError::Http(e.to_string()))?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<DaemonResponse> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DualcastError::Http(e.to_string()))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| DualcastError::Serialization(e.to_string()))?
        };
        Ok(DaemonResponse { status, body })
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slashes() {
        assert_eq!(
            join_url("http://127.0.0.1:7878/", "/deliver"),
            "http://127.0.0.1:7878/deliver"
        );
        assert_eq!(join_url("http://h", "status"), "http://h/status");
    }
}
