//! HTTP transport seam
//!
//! The pipeline only sees [`Transport`]; [`ReqwestTransport`] is the real
//! network implementation and tests can substitute their own.

use super::TransportError;
use super::request::RequestBody;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, ClientBuilder, Method, StatusCode};

/// Fully prepared request handed to a transport
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub endpoint: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Raw response as read off the wire
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl WireResponse {
    /// Whether the body is declared as JSON
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

/// Sends prepared requests to the backend
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport for the given base URL
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new().user_agent(user_agent).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.endpoint);
        let builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(
                serde_json::to_vec(&value).map_err(|err| TransportError::Other(err.to_string()))?,
            ),
            RequestBody::Multipart(payload) => builder.multipart(payload.to_form()?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        Ok(WireResponse {
            status,
            content_type,
            body,
        })
    }
}
