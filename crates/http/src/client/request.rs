//! Request descriptors and per-call pipeline options

use super::{ClientError, TransportError};
use bytes::Bytes;
use konata_core::AuthVariant;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// File attached to a multipart upload
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FilePart {
    /// Create a file part from in-memory bytes
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Set the MIME type sent for the part
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk, naming the part after the file
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }
}

/// Multipart form: one file field plus plain string fields
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    pub field_name: String,
    pub file: FilePart,
    pub fields: Vec<(String, String)>,
}

impl MultipartPayload {
    pub(crate) fn to_form(&self) -> Result<reqwest::multipart::Form, TransportError> {
        let mut part =
            reqwest::multipart::Part::bytes(self.file.bytes.to_vec()).file_name(self.file.file_name.clone());
        if let Some(content_type) = &self.file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|err| TransportError::Other(err.to_string()))?;
        }

        let form = self.fields.iter().fold(
            reqwest::multipart::Form::new().part(self.field_name.clone(), part),
            |form, (key, value)| form.text(key.clone(), value.clone()),
        );
        Ok(form)
    }
}

/// Request payload
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(JsonValue),
    Multipart(MultipartPayload),
}

/// Everything needed to issue (and re-issue) one backend call
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub endpoint: String,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    /// Create a descriptor without a body
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart body
    #[must_use]
    pub fn multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }

    /// Add a header override
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// JSON body, if any
    pub const fn json_body(&self) -> Option<&JsonValue> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Headers sent on the wire: caller overrides, JSON content type, credential
    pub(crate) fn wire_headers(
        &self,
        token: Option<&str>,
        variant: AuthVariant,
    ) -> Result<HeaderMap, ClientError> {
        let mut headers = self.headers.clone();

        if matches!(self.body, RequestBody::Json(_)) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&authorization_value(token, variant))
                .map_err(|_| {
                    ClientError::Configuration("stored token is not a valid header value".into())
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

/// Per-call pipeline options
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// This call is the retry after a successful refresh
    pub refreshed: bool,
    /// Header rendering override; the client default applies when `None`
    pub auth_variant: Option<AuthVariant>,
    /// Never clear the stored token when this call fails with 401
    pub suppress_auth_clear: bool,
    /// Never start a token refresh for this call
    pub skip_refresh: bool,
    /// Deadline override for this call
    pub timeout: Option<Duration>,
    /// Cancels the call (and any refresh/validation it triggers)
    pub cancel: Option<CancellationToken>,
}

impl RequestMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for calls that maintain the credential itself (refresh, validate)
    pub fn unattended() -> Self {
        Self {
            suppress_auth_clear: true,
            skip_refresh: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_auth_variant(mut self, variant: AuthVariant) -> Self {
        self.auth_variant = Some(variant);
        self
    }

    #[must_use]
    pub const fn suppress_auth_clear(mut self) -> Self {
        self.suppress_auth_clear = true;
        self
    }

    #[must_use]
    pub const fn skip_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Strip a leading `Bearer` scheme (any casing) followed by whitespace
fn strip_bearer_prefix(token: &str) -> Option<&str> {
    let (scheme, rest) = token.split_at_checked("Bearer".len())?;
    if scheme.eq_ignore_ascii_case("bearer") && rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Render the `Authorization` header value for a stored token
///
/// Never double-prefixes: a token that already carries a `Bearer` scheme is
/// sent as-is in the bearer variant and stripped in the raw variant.
pub fn authorization_value(token: &str, variant: AuthVariant) -> String {
    let trimmed = token.trim();
    match (variant, strip_bearer_prefix(trimmed)) {
        (AuthVariant::Raw, Some(bare)) => bare.trim().to_string(),
        (AuthVariant::Raw, None) | (AuthVariant::Bearer, Some(_)) => trimmed.to_string(),
        (AuthVariant::Bearer, None) => format!("Bearer {trimmed}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_variant_adds_prefix() {
        assert_eq!(
            authorization_value("abc123", AuthVariant::Bearer),
            "Bearer abc123"
        );
        assert_eq!(
            authorization_value("  abc123 \n", AuthVariant::Bearer),
            "Bearer abc123"
        );
    }

    #[test]
    fn test_bearer_variant_never_double_prefixes() {
        for token in ["Bearer abc123", "bearer abc123", "BEARER\tabc123"] {
            let value = authorization_value(token, AuthVariant::Bearer);
            assert_eq!(value, token);
            assert_eq!(value.to_ascii_lowercase().matches("bearer").count(), 1);
        }
    }

    #[test]
    fn test_raw_variant_strips_prefix() {
        assert_eq!(authorization_value("Bearer abc123", AuthVariant::Raw), "abc123");
        assert_eq!(authorization_value("bEaReR   abc123", AuthVariant::Raw), "abc123");
        assert_eq!(authorization_value("abc123", AuthVariant::Raw), "abc123");
    }

    #[test]
    fn test_token_starting_with_bearer_word_is_not_a_prefix() {
        assert_eq!(
            authorization_value("bearerish-token", AuthVariant::Bearer),
            "Bearer bearerish-token"
        );
    }

    #[test]
    fn test_wire_headers_json_body() {
        let descriptor = RequestDescriptor::post("/posts")
            .json(&serde_json::json!({"title": "Hello"}))
            .unwrap();
        let headers = descriptor
            .wire_headers(Some("tok"), AuthVariant::Bearer)
            .unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
    }

    #[test]
    fn test_wire_headers_respects_caller_content_type() {
        let descriptor = RequestDescriptor::put("/settings")
            .json(&serde_json::json!({}))
            .unwrap()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/merge-patch+json"));
        let headers = descriptor.wire_headers(None, AuthVariant::Bearer).unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/merge-patch+json");
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_wire_headers_skip_content_type_for_multipart_and_empty() {
        let payload = MultipartPayload {
            field_name: "file".into(),
            file: FilePart::new("a.txt", "hello"),
            fields: vec![],
        };
        let upload = RequestDescriptor::post("/media/upload").multipart(payload);
        assert!(
            !upload
                .wire_headers(None, AuthVariant::Bearer)
                .unwrap()
                .contains_key(CONTENT_TYPE)
        );

        let get = RequestDescriptor::get("/tags");
        assert!(
            !get.wire_headers(None, AuthVariant::Bearer)
                .unwrap()
                .contains_key(CONTENT_TYPE)
        );
    }
}
