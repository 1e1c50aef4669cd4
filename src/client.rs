//! Thin HTTP client for any replog node

use crate::common::{Error, PostMessage, Result};
use reqwest::StatusCode;

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Build a client for `base_url` and check the node answers `/ping`
    pub async fn connect(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Self {
            http: reqwest::Client::new(),
            base_url,
        };
        client.ping().await?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn ping(&self) -> Result<()> {
        let response = self.http.get(self.url("/ping")).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK || body != "pong" {
            return Err(self.unexpected(format!("ping returned {} {:?}", status, body)));
        }
        Ok(())
    }

    pub async fn get_messages(&self) -> Result<Vec<String>> {
        let response = self.http.get(self.url("/messages")).send().await?;
        if response.status() != StatusCode::OK {
            return Err(self.unexpected(format!("status {}", response.status())));
        }
        Ok(response.json().await?)
    }

    /// Post `msg`; succeeds only on `200` with the message echoed back
    pub async fn post_message(&self, msg: &PostMessage) -> Result<()> {
        let response = self.http.post(self.url("/messages")).json(msg).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unexpected(format!("status {}: {}", status, body)));
        }

        let echoed: String = response.json().await?;
        if echoed != msg.message {
            return Err(self.unexpected(format!(
                "expected {:?} echoed back, got {:?}",
                msg.message, echoed
            )));
        }
        Ok(())
    }

    /// Raw JSON from a node's `/status` (secondary) or `/health` (master)
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let response = self.http.get(self.url(path)).send().await?;
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn unexpected(&self, reason: String) -> Error {
        Error::UnexpectedResponse {
            node: self.base_url.clone(),
            reason,
        }
    }
}
