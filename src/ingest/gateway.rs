//! The push-notification boundary.
//!
//! The push SDK itself is out of scope; this crate only defines the trait
//! the `WatchlistProcessor`'s dispatch loop calls through, plus a thin
//! HTTP-based implementation and a no-op one for when no credentials are
//! configured or under test.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The notification envelope handed to a device, independent of payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(
        &self,
        token: &str,
        notification: PushNotification,
        data: serde_json::Value,
    ) -> Result<()>;
}

/// Posts to a generic HTTPS push endpoint with a bearer-token `reqwest::Client`.
pub struct HttpPushGateway {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpPushGateway {
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Gateway(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct SendRequest {
    to: String,
    notification: PushNotification,
    data: serde_json::Value,
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(
        &self,
        token: &str,
        notification: PushNotification,
        data: serde_json::Value,
    ) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                to: token.to_string(),
                notification,
                data,
            })
            .send()
            .await
            .map_err(|e| Error::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "push gateway returned {}",
                response.status()
            )));
        }
        debug!(token, "push notification sent");
        Ok(())
    }
}

/// Logs instead of sending. Used when no push credentials are configured.
#[derive(Default)]
pub struct NoopPushGateway;

#[async_trait]
impl PushGateway for NoopPushGateway {
    async fn send(
        &self,
        token: &str,
        notification: PushNotification,
        _data: serde_json::Value,
    ) -> Result<()> {
        warn!(token, title = %notification.title, "push gateway not configured, dropping notification");
        Ok(())
    }
}
