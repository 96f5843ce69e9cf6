//! Transport adapter: POST a signed message to the routing service and
//! verify the signed reply before anything reads it.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::dsig;
use crate::error::Result;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Routing service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timeout after {0:?} waiting for the routing service")]
    Timeout(Duration),
}

/// Delivers a request body to an endpoint and returns the raw reply body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: &str, body: String) -> std::result::Result<String, TransportError>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Give up on a reply after `timeout`; without one a call waits as long
    /// as the connection stays open
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: &str, body: String) -> std::result::Result<String, TransportError> {
        let request = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body)
            .send();

        let response = match self.timeout {
            Some(limit) => match timeout(limit, request).await {
                Ok(result) => result?,
                Err(_) => return Err(TransportError::Timeout(limit)),
            },
            None => request.await?,
        };

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// Send `payload` and return the reply once its signature verifies against
/// `routing_cert`
pub async fn fetch_response<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &str,
    payload: String,
    routing_cert: &str,
) -> Result<String> {
    info!(endpoint, bytes = payload.len(), "Posting iDx request");
    let reply = transport.post(endpoint, payload).await?;
    debug!(bytes = reply.len(), "Received iDx response");

    let verified = dsig::verify(&reply, routing_cert)?;
    Ok(verified.to_string())
}
