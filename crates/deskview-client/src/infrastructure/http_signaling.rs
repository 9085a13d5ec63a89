//! HTTP implementation of [`SignalingTransport`].
//!
//! Every call is a `POST` to `<server_url><endpoint path>` with
//! `Accept: application/json, text/plain, */*` and
//! `Content-Type: application/json`.  Response bodies are read as text and
//! decoded with `serde_json`, so a body that is not the expected JSON is a
//! [`SignalingError::Decode`] rather than a transport error.

use std::time::Duration;

use async_trait::async_trait;
use deskview_core::{IceServer, SessionDescription, SignalingEndpoint};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use tracing::debug;

use crate::application::signaling::{SignalingError, SignalingTransport};

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors building an [`HttpSignaling`] client.
#[derive(Debug, Error)]
pub enum HttpSignalingError {
    #[error("server URL must start with http:// or https://, got '{0}'")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Signaling over plain HTTP request/response calls.
pub struct HttpSignaling {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSignaling {
    /// Creates a client for the server at `base_url`.
    ///
    /// `timeout` bounds each request; `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// [`HttpSignalingError::InvalidUrl`] for a non-HTTP URL, or
    /// [`HttpSignalingError::Client`] if the TLS backend cannot initialise.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, HttpSignalingError> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(HttpSignalingError::InvalidUrl(base_url.to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    /// Full URL of `endpoint`.
    pub fn url_for(&self, endpoint: SignalingEndpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn post(
        &self,
        endpoint: SignalingEndpoint,
        body: Option<String>,
    ) -> Result<String, SignalingError> {
        let url = self.url_for(endpoint);
        debug!(%url, "signaling request");

        let mut request = self
            .client
            .post(&url)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| SignalingError::Network {
            endpoint,
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SignalingError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| SignalingError::Network {
            endpoint,
            reason: e.to_string(),
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    endpoint: SignalingEndpoint,
    body: &str,
) -> Result<T, SignalingError> {
    serde_json::from_str(body).map_err(|e| SignalingError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}

#[async_trait]
impl SignalingTransport for HttpSignaling {
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServer>, SignalingError> {
        let endpoint = SignalingEndpoint::IceServers;
        let body = self.post(endpoint, None).await?;
        decode(endpoint, &body)
    }

    async fn exchange(
        &self,
        endpoint: SignalingEndpoint,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        let payload = serde_json::to_string(offer).map_err(|e| SignalingError::Encode {
            endpoint,
            reason: e.to_string(),
        })?;
        let body = self.post(endpoint, Some(payload)).await?;
        decode(endpoint, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_appends_endpoint_path() {
        let signaling = HttpSignaling::new("http://localhost:8080", None).unwrap();

        assert_eq!(
            signaling.url_for(SignalingEndpoint::IceServers),
            "http://localhost:8080/iceServers"
        );
        assert_eq!(
            signaling.url_for(SignalingEndpoint::StopVideo),
            "http://localhost:8080/stopVideo"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url_is_dropped() {
        let signaling = HttpSignaling::new("https://remote.example.org/", None).unwrap();

        assert_eq!(
            signaling.url_for(SignalingEndpoint::StartVideo),
            "https://remote.example.org/startVideo"
        );
    }

    #[test]
    fn test_non_http_url_is_rejected() {
        let result = HttpSignaling::new("ws://localhost:8080", None);

        assert!(matches!(result, Err(HttpSignalingError::InvalidUrl(_))));
    }
}
