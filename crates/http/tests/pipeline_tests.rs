//! Pipeline tests: single-flight refresh, offline fallback, deadlines

#![cfg(feature = "client")]

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use konata_http::client::{
    BlogClient, ClientError, DemoFallback, NoFallback, PageParams, RequestDescriptor,
    RequestMeta, Session, TokenEvent, TokenStore, Transport, TransportError, WireRequest,
    WireResponse,
};
use konata_http::types::Tag;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

/// Base URL nothing listens on
fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api")
}

/// Transport answering from a closure and recording every endpoint it sees
struct ScriptedTransport {
    handler: Box<dyn Fn(&WireRequest) -> Result<WireResponse, TransportError> + Send + Sync>,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        self.seen.lock().unwrap().push(request.endpoint.clone());
        (self.handler)(&request)
    }
}

fn json_response(status: StatusCode, body: Value) -> WireResponse {
    WireResponse {
        status,
        content_type: Some("application/json".to_string()),
        body: Bytes::from(serde_json::to_vec(&body).unwrap()),
    }
}

/// Transport whose refresh never answers; flags when the client releases it
struct StalledRefreshTransport {
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for StalledRefreshTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        if request.endpoint == "/auth/refresh" {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(json_response(
            StatusCode::UNAUTHORIZED,
            json!({ "success": false, "data": null }),
        ))
    }
}

impl Drop for StalledRefreshTransport {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mock_server = MockServer::start().await;
    let callers = 5;

    Mock::given(method("GET"))
        .and(path("/posts/admin/all"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(callers)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ok(json!("fresh")).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/posts/admin/all"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(json!({
            "content": [],
            "totalElements": 0,
            "totalPages": 0,
            "first": true,
            "last": true,
            "size": 10,
            "number": 0
        })))
        .expect(callers)
        .mount(&mock_server)
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_token("stale").unwrap();
    let client = BlogClient::builder()
        .base_url(mock_server.uri())
        .token_store(tokens.clone())
        .build()
        .unwrap();

    let paging = PageParams::new();
    let results = join_all((0..callers).map(|_| client.get_admin_posts(&paging))).await;

    for result in results {
        assert!(result.unwrap().success);
    }
    assert_eq!(tokens.get_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_failed_refresh_is_observed_by_every_waiter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/validate"))
        .respond_with(ok(json!(false)))
        .mount(&mock_server)
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_token("revoked").unwrap();
    let client = BlogClient::builder()
        .base_url(mock_server.uri())
        .token_store(tokens.clone())
        .build()
        .unwrap();

    let results = join_all((0..3).map(|_| client.get_tags())).await;

    for result in results {
        assert!(!result.unwrap().success);
    }
    assert_eq!(tokens.get_token(), None);
}

#[tokio::test]
async fn test_unreachable_validation_keeps_token() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport {
        handler: Box::new(|request| match request.endpoint.as_str() {
            "/auth/validate" => Err(TransportError::Connection("connection refused".into())),
            _ => Ok(json_response(
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "data": null }),
            )),
        }),
        seen: Arc::clone(&seen),
    };

    let tokens = TokenStore::in_memory();
    tokens.set_token("keep-me").unwrap();
    let client = BlogClient::builder()
        .transport(transport)
        .token_store(tokens.clone())
        .fallback(NoFallback)
        .build()
        .unwrap();

    let response = client.get_themes().await.unwrap();

    assert!(!response.success);
    assert_eq!(response.error.unwrap().code, "401");
    assert_eq!(tokens.get_token().as_deref(), Some("keep-me"));
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["/themes", "/auth/refresh", "/auth/validate"]
    );
}

#[tokio::test]
async fn test_suppressed_request_never_clears_token() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport {
        handler: Box::new(|_| {
            Ok(json_response(
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "data": null }),
            ))
        }),
        seen: Arc::clone(&seen),
    };

    let tokens = TokenStore::in_memory();
    tokens.set_token("abc").unwrap();
    let client = BlogClient::builder()
        .transport(transport)
        .token_store(tokens.clone())
        .build()
        .unwrap();

    let meta = RequestMeta::new().suppress_auth_clear().skip_refresh();
    let response: konata_http::ApiResponse<Value> = client
        .request(RequestDescriptor::get("/settings"), meta)
        .await
        .unwrap();

    assert!(!response.success);
    assert_eq!(tokens.get_token().as_deref(), Some("abc"));
    assert_eq!(*seen.lock().unwrap(), vec!["/settings"]);
}

#[tokio::test]
async fn test_offline_admin_login() {
    let tokens = TokenStore::in_memory();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    tokens.subscribe(move |event| sink.lock().unwrap().push(event));

    let client = BlogClient::builder()
        .base_url(unreachable_base_url())
        .token_store(tokens.clone())
        .fallback(DemoFallback::new())
        .build()
        .unwrap();

    let response = client.login("admin", "admin").await.unwrap();

    assert!(response.success);
    let login = response.data.unwrap();
    assert_eq!(login.token, "mock_admin_token");
    assert_eq!(login.user.email, "admin@example.com");
    assert_eq!(tokens.get_token().as_deref(), Some("mock_admin_token"));
    assert_eq!(*events.lock().unwrap(), vec![TokenEvent::Set]);

    let err = client.login("admin", "wrong").await.unwrap_err();
    assert!(matches!(err, ClientError::OfflineRejected(msg) if msg == "Invalid credentials"));
}

#[tokio::test]
async fn test_offline_serves_seeded_tags_and_rejects_unknown_endpoints() {
    let tag: Tag = serde_json::from_value(json!({
        "id": 1,
        "name": "rust",
        "slug": "rust",
        "createdAt": "2024-05-01T10:00:00",
        "updatedAt": "2024-05-01T10:00:00"
    }))
    .unwrap();

    let client = BlogClient::builder()
        .base_url(unreachable_base_url())
        .fallback(DemoFallback::new().with_tags(vec![tag.clone()]))
        .build()
        .unwrap();

    let tags = client.get_tags().await.unwrap();
    assert_eq!(tags.data, Some(vec![tag]));

    let err = client.get_themes().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Connection(_))
    ));
}

#[tokio::test]
async fn test_no_fallback_propagates_connection_errors() {
    let client = BlogClient::builder()
        .base_url(unreachable_base_url())
        .fallback(NoFallback)
        .build()
        .unwrap();

    let err = client.get_tags().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Connection(_))
    ));
}

#[tokio::test]
async fn test_deadline_and_cancellation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ok(json!([])).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = BlogClient::builder()
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = client.get_tags().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout));

    let generous = RequestMeta::new().with_timeout(Duration::from_secs(5));
    let response: konata_http::ApiResponse<Vec<Tag>> = client
        .request(RequestDescriptor::get("/tags"), generous)
        .await
        .unwrap();
    assert!(response.success);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let meta = RequestMeta::new()
        .with_timeout(Duration::from_secs(5))
        .with_cancellation(cancel);
    let err = client
        .request::<Vec<Tag>>(RequestDescriptor::get("/tags"), meta)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn test_session_tracks_login_and_token_removal() {
    let tokens = TokenStore::in_memory();
    let client = BlogClient::builder()
        .base_url(unreachable_base_url())
        .token_store(tokens.clone())
        .build()
        .unwrap();

    let session = Session::new(client.clone());
    assert_eq!(session.refresh_user().await, None);

    let user = session.login("admin", "admin").await.unwrap();
    assert_eq!(user.username, "admin");
    assert!(session.is_authenticated());

    // Offline profile lookups answer with the demo user
    let refreshed = session.refresh_user().await.unwrap();
    assert_eq!(refreshed.display_name.as_deref(), Some("Admin User"));

    tokens.remove_token().unwrap();
    assert!(!session.is_authenticated());

    drop(session);
    assert_eq!(tokens.listener_count(), 0);
}

#[tokio::test]
async fn test_abandoned_refresh_releases_client() {
    let dropped = Arc::new(AtomicBool::new(false));
    let tokens = TokenStore::in_memory();
    tokens.set_token("stale").unwrap();
    let client = BlogClient::builder()
        .transport(StalledRefreshTransport {
            dropped: Arc::clone(&dropped),
        })
        .token_store(tokens)
        .fallback(NoFallback)
        .build()
        .unwrap();

    let meta = RequestMeta::new().with_timeout(Duration::from_millis(50));
    let err = client
        .request::<Value>(RequestDescriptor::get("/themes"), meta)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout));

    drop(client);
    assert!(dropped.load(Ordering::SeqCst));
}
