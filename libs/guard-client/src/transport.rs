//! HTTP transport for the authentication service
//!
//! Every call is bounded by the configured request timeout. Status handling
//! is uniform across endpoints:
//!
//! - 2xx: success; a required body that is empty is `NoContent`, an
//!   unparseable one is `Decode`
//! - 4xx: `AuthRejected` with the envelope's `detail`, or "Unknown error"
//! - any other status: `AuthRejected` if the envelope carries a `detail`,
//!   otherwise `Protocol(UnexpectedStatus)`
//!
//! Dropping a returned future cancels the request. Bodies are parsed only
//! once fully read, so a cancelled call never yields partial values.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use guard_core::{GuardError, ProtocolError, Result, UNKNOWN_ERROR};

use crate::config::{ConfigError, GuardConfig};
use crate::models::ErrorEnvelope;

/// Shared JSON-over-HTTP client for one authentication service
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &GuardConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body and decode a JSON response body
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.client.post(self.url(path)).json(body), path).await?;
        self.read_json(response, path).await
    }

    /// POST a JSON body where success carries no meaningful body
    pub async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(self.client.post(self.url(path)).json(body), path).await?;
        self.read_empty(response, path).await
    }

    /// GET and decode a JSON response body
    pub async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        self.read_json(response, path).await
    }

    /// GET where success carries no meaningful body
    pub async fn get_no_content(&self, path: &str) -> Result<()> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        self.read_empty(response, path).await
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        request.send().await.map_err(|e| {
            let err = self.map_reqwest_error(e);
            warn!(path, error = %err, "Request to authentication service failed");
            err
        })
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response, path: &str) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(reject(path, status, &body));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            warn!(path, status = status.as_u16(), "Success response had no body");
            return Err(ProtocolError::NoContent.into());
        }

        debug!(path, status = status.as_u16(), "Authentication service call succeeded");
        serde_json::from_slice(&body).map_err(|e| ProtocolError::Decode(e.to_string()).into())
    }

    async fn read_empty(&self, response: Response, path: &str) -> Result<()> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(reject(path, status, &body));
        }

        debug!(path, status = status.as_u16(), "Authentication service call succeeded");
        Ok(())
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> GuardError {
        if err.is_timeout() {
            ProtocolError::Timeout(self.request_timeout).into()
        } else if err.is_connect() {
            ProtocolError::Connect(err.to_string()).into()
        } else if err.is_decode() {
            ProtocolError::Decode(err.to_string()).into()
        } else {
            ProtocolError::Transport(err.to_string()).into()
        }
    }
}

fn reject(path: &str, status: StatusCode, body: &[u8]) -> GuardError {
    let err = classify_failure(status, body);
    debug!(path, status = status.as_u16(), error = %err, "Authentication service refused request");
    err
}

/// Map a non-2xx response onto the error taxonomy
pub fn classify_failure(status: StatusCode, body: &[u8]) -> GuardError {
    let detail = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.detail)
        .filter(|detail| !detail.trim().is_empty());

    if status.is_client_error() {
        return GuardError::rejected(detail);
    }

    match detail {
        Some(detail) => GuardError::AuthRejected(detail),
        None => ProtocolError::UnexpectedStatus {
            status: status.as_u16(),
            reason: status
                .canonical_reason()
                .unwrap_or(UNKNOWN_ERROR)
                .to_string(),
        }
        .into(),
    }
}
