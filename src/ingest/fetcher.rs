//! Two-request upstream fetch cycle with conditional-request shortcutting.

use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

const TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

/// Conditional-request state carried across ticks, scoped to the Fetcher
/// and mutated only by the single tick in flight.
#[derive(Debug, Default, Clone)]
pub struct ConditionalState {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Outcome of one fetch cycle.
pub enum FetchOutcome {
    /// The XHR endpoint returned 304; nothing else was fetched.
    NotModified,
    /// Fresh JSON rows and the HTML page, ready for the Parser.
    Fresh { rows: Vec<Value>, html: String },
}

pub struct Fetcher {
    client: Client,
    base_url: String,
    xhr_url: String,
}

impl Fetcher {
    pub fn new(base_url: String, xhr_url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            xhr_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one fetch cycle, consulting and updating `state` in place.
    pub async fn fetch(&self, state: &mut ConditionalState) -> Result<FetchOutcome> {
        let mut request = self.client.get(&self.xhr_url);
        if let Some(etag) = &state.etag {
            request = request.header(header::IF_NONE_MATCH, etag.as_str());
        }
        if let Some(last_modified) = &state.last_modified {
            request = request.header(header::IF_MODIFIED_SINCE, last_modified.as_str());
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_MODIFIED => {
                debug!("xhr endpoint returned 304, skipping tick");
                Ok(FetchOutcome::NotModified)
            }
            StatusCode::OK => {
                if let Some(etag) = response.headers().get(header::ETAG) {
                    state.etag = etag.to_str().ok().map(str::to_owned);
                }
                if let Some(last_modified) = response.headers().get(header::LAST_MODIFIED) {
                    state.last_modified = last_modified.to_str().ok().map(str::to_owned);
                }

                let body = response.text().await?;
                let rows = parse_xhr_body(&body)?;

                let html = self
                    .client
                    .get(&self.base_url)
                    .send()
                    .await?
                    .text()
                    .await?;

                Ok(FetchOutcome::Fresh { rows, html })
            }
            other => Err(Error::UnexpectedStatus(other.as_u16())),
        }
    }
}

/// Lenient JSON decode of the XHR body: either an already-JSON array, or a
/// JSON-encoded string wrapping one (empty string ⇒ empty array).
fn parse_xhr_body(body: &str) -> Result<Vec<Value>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(trimmed)?;
    match value {
        Value::Array(rows) => Ok(rows),
        Value::String(inner) => {
            let inner = inner.trim();
            if inner.is_empty() {
                Ok(Vec::new())
            } else {
                match serde_json::from_str::<Value>(inner)? {
                    Value::Array(rows) => Ok(rows),
                    other => Err(Error::Parse(format!(
                        "expected array after string-unwrapping xhr body, got {other}"
                    ))),
                }
            }
        }
        other => Err(Error::Parse(format!("unexpected xhr body shape: {other}"))),
    }
}
