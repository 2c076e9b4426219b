//! HTTP access to the local client API.

use std::time::Duration;

use async_trait::async_trait;
use overlay_types::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::{discovery::Endpoint, fetch_error};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The client answered 404: the resource does not exist right now.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ClientTransport: Send + Sync {
    async fn get_json(&self, endpoint: &Endpoint, path: &str) -> Result<Value, TransportError>;
}

/// `reqwest` transport with basic auth that accepts the client's
/// self-signed certificate.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|err| fetch_error(format!("unable to build http client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ClientTransport for ReqwestTransport {
    async fn get_json(&self, endpoint: &Endpoint, path: &str) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(endpoint.url(path))
            .basic_auth(&endpoint.username, Some(&endpoint.password))
            .send()
            .await
            .map_err(|err| TransportError::Failed(format!("{path}: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(TransportError::Failed(format!("{path}: http {status}")));
        }

        response
            .json()
            .await
            .map_err(|err| TransportError::Failed(format!("{path}: invalid body: {err}")))
    }
}
