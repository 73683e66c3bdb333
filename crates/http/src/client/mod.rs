//! KonataBlog HTTP client
//!
//! Every backend call goes through [`BlogClient::request`]: the stored token is
//! attached, a 401 triggers one shared token refresh and a single retry, and a
//! connection failure is answered from the configured [`FallbackProvider`].

pub mod auth;
pub mod categories;
pub mod error;
pub mod fallback;
pub mod media;
pub mod posts;
pub mod query;
mod refresh;
pub mod request;
pub mod session;
pub mod settings;
pub mod tags;
pub mod themes;
pub mod token;
pub mod transport;

pub use error::{ClientError, TransportError};
pub use fallback::{DemoFallback, FallbackProvider, FallbackResponse, NoFallback};
pub use konata_core::AuthVariant;
pub use media::MediaUpload;
pub use query::{
    CategoryQuery, MediaQuery, PageParams, PostFilter, PostSearch, QueryParams, Sort, SortDirection,
};
pub use request::{
    FilePart, MultipartPayload, RequestBody, RequestDescriptor, RequestMeta, authorization_value,
};
pub use session::Session;
pub use token::{
    FileTokenBackend, ListenerId, MemoryTokenBackend, TokenBackend, TokenEvent, TokenStore,
};
pub use transport::{ReqwestTransport, Transport, WireRequest, WireResponse};

use crate::types::ApiResponse;
use futures::FutureExt;
use futures::future::{BoxFuture, WeakShared};
use konata_core::ClientSettings;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// User agent used when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("konata-client/", env!("CARGO_PKG_VERSION"));

const VALIDATE_ENDPOINT: &str = "/auth/validate";

/// Endpoints whose 401 never triggers a refresh or a validation round-trip
const AUTH_ENDPOINTS: [&str; 4] = ["/auth/login", "/auth/logout", "/auth/refresh", VALIDATE_ENDPOINT];

fn is_auth_endpoint(endpoint: &str) -> bool {
    AUTH_ENDPOINTS.contains(&endpoint)
}

type PendingRefresh = WeakShared<BoxFuture<'static, bool>>;

struct ClientInner {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    fallback: Arc<dyn FallbackProvider>,
    auth_variant: AuthVariant,
    timeout: Option<Duration>,
    pending_refresh: Mutex<Option<PendingRefresh>>,
}

/// KonataBlog API client
#[derive(Clone)]
pub struct BlogClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for BlogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogClient")
            .field("auth_variant", &self.inner.auth_variant)
            .field("timeout", &self.inner.timeout)
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

impl BlogClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> BlogClientBuilder {
        BlogClientBuilder::default()
    }

    /// Create a client from layered settings, persisting the token on disk
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(settings.api.base_url.clone())
            .user_agent(settings.api.user_agent.clone())
            .auth_variant(settings.auth.variant)
            .token_store(TokenStore::file(settings.token_path()));

        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if !settings.offline.enabled {
            builder = builder.fallback(NoFallback);
        }

        builder.build()
    }

    /// Token store shared by every clone of this client
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Run one request through the authentication pipeline
    ///
    /// Backend failures come back as an envelope with `success == false`;
    /// see [`ClientError`] for the cases that are returned as errors.
    pub async fn request<T>(
        &self,
        descriptor: RequestDescriptor,
        meta: RequestMeta,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let timeout = meta.timeout.or(self.inner.timeout);
        let cancel = meta.cancel.clone();
        guarded(timeout, cancel, self.dispatch(descriptor, meta)).await
    }

    pub async fn get<T>(&self, endpoint: impl Into<String>) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(RequestDescriptor::get(endpoint), RequestMeta::new())
            .await
    }

    pub async fn post<T, B>(
        &self,
        endpoint: impl Into<String>,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        let descriptor = RequestDescriptor::post(endpoint).json(body)?;
        self.request(descriptor, RequestMeta::new()).await
    }

    /// POST without a body
    pub async fn post_empty<T>(
        &self,
        endpoint: impl Into<String>,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(RequestDescriptor::post(endpoint), RequestMeta::new())
            .await
    }

    pub async fn put<T, B>(
        &self,
        endpoint: impl Into<String>,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        let descriptor = RequestDescriptor::put(endpoint).json(body)?;
        self.request(descriptor, RequestMeta::new()).await
    }

    pub async fn patch<T, B>(
        &self,
        endpoint: impl Into<String>,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        let descriptor = RequestDescriptor::patch(endpoint).json(body)?;
        self.request(descriptor, RequestMeta::new()).await
    }

    pub async fn delete<T>(
        &self,
        endpoint: impl Into<String>,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request(RequestDescriptor::delete(endpoint), RequestMeta::new())
            .await
    }

    /// POST a multipart form with one file field
    ///
    /// Bypasses refresh and offline fallback. Any non-success status or an
    /// unreadable body is returned as [`ClientError::Upload`].
    pub async fn upload_file<T>(
        &self,
        endpoint: &str,
        file: FilePart,
        fields: Vec<(String, String)>,
        field_name: &str,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let descriptor = RequestDescriptor::post(endpoint).multipart(MultipartPayload {
            field_name: field_name.to_string(),
            file,
            fields,
        });
        let headers =
            descriptor.wire_headers(self.inner.tokens.get_token().as_deref(), AuthVariant::Bearer)?;
        let wire = WireRequest {
            method: descriptor.method,
            endpoint: descriptor.endpoint,
            headers,
            body: descriptor.body,
        };

        debug!(endpoint, field_name, "uploading file");
        let send = async {
            match self.inner.transport.send(wire).await {
                Ok(response) => Ok(response),
                Err(TransportError::Timeout) => Err(ClientError::Timeout),
                Err(err) => Err(ClientError::Transport(err)),
            }
        };
        let response = guarded(self.inner.timeout, None, send).await?;

        let envelope: ApiResponse<JsonValue> =
            serde_json::from_slice(&response.body).map_err(|err| {
                debug!(error = %err, status = %response.status, "unreadable upload response");
                ClientError::Upload("Upload failed".to_string())
            })?;

        if !response.status.is_success() {
            let message = envelope
                .error
                .map(|error| error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "Upload failed".to_string());
            return Err(ClientError::Upload(message));
        }

        typed_envelope(envelope, response.status)
    }

    /// One pass through the pipeline; recurses once for the post-refresh retry
    fn dispatch<'a, T>(
        &'a self,
        descriptor: RequestDescriptor,
        meta: RequestMeta,
    ) -> BoxFuture<'a, Result<ApiResponse<T>, ClientError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        async move {
            let token = self.inner.tokens.get_token();
            let variant = meta.auth_variant.unwrap_or(self.inner.auth_variant);
            let wire = WireRequest {
                method: descriptor.method.clone(),
                endpoint: descriptor.endpoint.clone(),
                headers: descriptor.wire_headers(token.as_deref(), variant)?,
                body: descriptor.body.clone(),
            };

            debug!(
                method = %wire.method,
                endpoint = %wire.endpoint,
                refreshed = meta.refreshed,
                "dispatching request"
            );

            let response = match self.inner.transport.send(wire).await {
                Ok(response) => response,
                Err(err) => return self.recover(&descriptor, err),
            };

            let envelope = decode_envelope::<T>(&response)?;
            if response.status.is_success() {
                return Ok(envelope);
            }

            if response.status == StatusCode::UNAUTHORIZED {
                let auth_endpoint = is_auth_endpoint(&descriptor.endpoint);
                let may_refresh =
                    token.is_some() && !auth_endpoint && !meta.refreshed && !meta.skip_refresh;

                if may_refresh && self.try_refresh_token().await {
                    let retry = RequestMeta {
                        refreshed: true,
                        ..meta
                    };
                    return self.dispatch(descriptor, retry).await;
                }

                if !meta.suppress_auth_clear {
                    self.discard_rejected_token(token.is_some() && !auth_endpoint, variant)
                        .await;
                }
            }

            debug!(
                endpoint = %descriptor.endpoint,
                status = %response.status,
                "request failed"
            );
            Ok(envelope.into_failure(response.status.as_u16(), response.status.canonical_reason()))
        }
        .boxed()
    }

    /// Clear the stored token after a 401 unless the backend still accepts it
    async fn discard_rejected_token(&self, validate: bool, variant: AuthVariant) {
        if validate {
            let meta = RequestMeta::unattended().with_auth_variant(variant);
            match self
                .dispatch::<bool>(RequestDescriptor::get(VALIDATE_ENDPOINT), meta)
                .await
            {
                Ok(validation) if validation.success && validation.data == Some(true) => {
                    debug!("token still valid after 401, keeping it");
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "could not validate token, keeping it");
                    return;
                }
            }
        }

        info!("clearing rejected token");
        if let Err(err) = self.inner.tokens.remove_token() {
            warn!(error = %err, "failed to clear rejected token");
        }
    }

    /// Answer a failed send from the fallback provider when possible
    fn recover<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        err: TransportError,
    ) -> Result<ApiResponse<T>, ClientError> {
        match err {
            TransportError::Connection(_) => {}
            TransportError::Timeout => return Err(ClientError::Timeout),
            TransportError::Other(_) => return Err(err.into()),
        }

        match self.inner.fallback.respond(descriptor) {
            Some(FallbackResponse::Envelope(value)) => {
                warn!(endpoint = %descriptor.endpoint, "backend unreachable, serving offline data");
                typed_envelope(serde_json::from_value(value)?, StatusCode::OK)
            }
            Some(FallbackResponse::Reject(message)) => {
                warn!(endpoint = %descriptor.endpoint, %message, "backend unreachable, offline request rejected");
                Err(ClientError::OfflineRejected(message))
            }
            None => Err(err.into()),
        }
    }
}

/// Apply the deadline and cancellation token to a pipeline future
async fn guarded<R>(
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    work: impl Future<Output = Result<R, ClientError>>,
) -> Result<R, ClientError> {
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| ClientError::Timeout)?,
            None => work.await,
        }
    };

    match cancel {
        Some(cancel) => {
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(ClientError::Cancelled),
                result = bounded => result,
            }
        }
        None => bounded.await,
    }
}

/// Parse the body as an untyped envelope, or synthesize one from the status
fn raw_envelope(response: &WireResponse) -> ApiResponse<JsonValue> {
    if response.is_json() {
        match serde_json::from_slice(&response.body) {
            Ok(envelope) => return envelope,
            Err(err) => debug!(error = %err, "response body is not a valid envelope"),
        }
    }
    ApiResponse::bare(response.status.is_success())
}

/// Convert the payload of an untyped envelope to `T`
///
/// A successful response whose payload does not fit `T` is an error. A failed
/// response keeps its payload only when it fits, so the server's error code
/// and message always survive.
fn typed_envelope<T: DeserializeOwned>(
    envelope: ApiResponse<JsonValue>,
    status: StatusCode,
) -> Result<ApiResponse<T>, ClientError> {
    let ApiResponse {
        success,
        data,
        message,
        error,
    } = envelope;

    let data = match data {
        Some(value) if success && status.is_success() => Some(serde_json::from_value(value)?),
        Some(value) => serde_json::from_value(value).ok(),
        None => None,
    };

    Ok(ApiResponse {
        success,
        data,
        message,
        error,
    })
}

fn decode_envelope<T: DeserializeOwned>(
    response: &WireResponse,
) -> Result<ApiResponse<T>, ClientError> {
    typed_envelope(raw_envelope(response), response.status)
}

/// Builder for BlogClient
#[derive(Default)]
pub struct BlogClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    auth_variant: AuthVariant,
    transport: Option<Arc<dyn Transport>>,
    tokens: Option<TokenStore>,
    fallback: Option<Arc<dyn FallbackProvider>>,
}

impl BlogClientBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the default per-request deadline
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set how the token is rendered into the `Authorization` header
    #[must_use]
    pub const fn auth_variant(mut self, variant: AuthVariant) -> Self {
        self.auth_variant = variant;
        self
    }

    /// Use a custom transport instead of reqwest
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Share an existing token store
    #[must_use]
    pub fn token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the offline fallback provider
    #[must_use]
    pub fn fallback(mut self, fallback: impl FallbackProvider + 'static) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Build the client
    pub fn build(self) -> Result<BlogClient, ClientError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let base_url = self
                    .base_url
                    .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
                let user_agent = self
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
                let transport = ReqwestTransport::new(base_url, &user_agent)
                    .map_err(|err| ClientError::Configuration(err.to_string()))?;
                Arc::new(transport)
            }
        };

        Ok(BlogClient {
            inner: Arc::new(ClientInner {
                transport,
                tokens: self.tokens.unwrap_or_default(),
                fallback: self
                    .fallback
                    .unwrap_or_else(|| Arc::new(DemoFallback::new())),
                auth_variant: self.auth_variant,
                timeout: self.timeout,
                pending_refresh: Mutex::new(None),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = BlogClient::builder().build().unwrap_err();
        assert!(matches!(err, ClientError::Configuration(msg) if msg == "base_url is required"));
    }

    #[test]
    fn test_auth_endpoints_match_exactly() {
        assert!(is_auth_endpoint("/auth/login"));
        assert!(is_auth_endpoint("/auth/validate"));
        assert!(!is_auth_endpoint("/auth/profile"));
        assert!(!is_auth_endpoint("/auth/login?next=/admin"));
    }

    #[test]
    fn test_decode_envelope_synthesizes_on_non_json() {
        let html = WireResponse {
            status: StatusCode::OK,
            content_type: Some("text/html".into()),
            body: bytes::Bytes::from_static(b"<html></html>"),
        };
        let envelope = decode_envelope::<JsonValue>(&html).unwrap();
        assert!(envelope.success);
        assert!(envelope.data.is_none());

        let broken = WireResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: Some("application/json; charset=utf-8".into()),
            body: bytes::Bytes::from_static(b"{not json"),
        };
        let envelope = decode_envelope::<JsonValue>(&broken).unwrap();
        assert!(!envelope.success);
        assert!(envelope.error.is_none());
    }

    fn json_response(status: StatusCode, body: &JsonValue) -> WireResponse {
        WireResponse {
            status,
            content_type: Some("application/json".into()),
            body: bytes::Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_decode_envelope_keeps_server_error_when_data_does_not_fit() {
        let response = json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({
                "success": false,
                "data": {"title": "must not be blank"},
                "error": {"code": "VALIDATION_ERROR", "message": "Invalid post"}
            }),
        );
        let envelope = decode_envelope::<Vec<i64>>(&response).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());

        let error = envelope.into_failure(400, Some("Bad Request")).error.unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert_eq!(error.message, "Invalid post");
    }

    #[test]
    fn test_decode_envelope_rejects_mismatched_success_payload() {
        let response = json_response(
            StatusCode::OK,
            &serde_json::json!({"success": true, "data": {"unexpected": "shape"}}),
        );
        let err = decode_envelope::<Vec<i64>>(&response).unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }
}
