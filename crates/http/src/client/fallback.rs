//! Offline fallback data
//!
//! Consulted only when the transport reports a connection failure. The
//! responses are static demo data so the blog stays usable without a backend;
//! nothing here is derived from earlier responses.

use super::request::RequestDescriptor;
use crate::types::{Category, Post, PostStatus, Tag};
use reqwest::Method;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

/// Token handed out by the demo login
pub const DEMO_TOKEN: &str = "mock_admin_token";

/// Answer from a fallback provider
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackResponse {
    /// Envelope JSON served in place of the backend's
    Envelope(JsonValue),
    /// The endpoint is known but the request is refused
    Reject(String),
}

/// Supplies responses while the backend is unreachable
pub trait FallbackProvider: Send + Sync {
    /// `None` means the endpoint has no offline answer
    fn respond(&self, request: &RequestDescriptor) -> Option<FallbackResponse>;
}

/// Disables degraded mode: every connection failure reaches the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackProvider for NoFallback {
    fn respond(&self, _request: &RequestDescriptor) -> Option<FallbackResponse> {
        None
    }
}

/// Canned demo backend with an `admin`/`admin` account
#[derive(Debug, Clone, Default)]
pub struct DemoFallback {
    posts: Vec<Post>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
}

impl DemoFallback {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = posts;
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    fn login(request: &RequestDescriptor) -> FallbackResponse {
        let body = request.json_body();
        let field = |name: &str| body.and_then(|b| b.get(name)).and_then(JsonValue::as_str);

        if field("username") == Some("admin") && field("password") == Some("admin") {
            let mut user = demo_user();
            if let Some(fields) = user.as_object_mut() {
                fields.remove("displayName");
            }
            ok(json!({ "token": DEMO_TOKEN, "user": user }))
        } else {
            FallbackResponse::Reject("Invalid credentials".to_string())
        }
    }

    fn update_profile(request: &RequestDescriptor) -> FallbackResponse {
        let mut user = demo_user();
        if let (Some(fields), Some(JsonValue::Object(body))) =
            (user.as_object_mut(), request.json_body())
        {
            for key in ["username", "email", "displayName", "nickname"] {
                if let Some(value) = body.get(key).filter(|v| is_truthy(v)) {
                    fields.insert(key.to_string(), value.clone());
                }
            }
        }
        ok(user)
    }

    fn posts(&self, endpoint: &str) -> FallbackResponse {
        if endpoint.starts_with("/posts/admin") {
            if let Some(slug) = segment_after(endpoint, "/posts/admin/slug/") {
                return self.post_where(|post| post.slug == slug);
            }
            if let Some(id) = endpoint
                .strip_prefix("/posts/admin/")
                .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|rest| rest.parse::<i64>().ok())
            {
                return self.post_where(|post| post.id == id);
            }
            return ok(page(&self.posts));
        }

        if let Some(slug) = segment_after(endpoint, "/slug/") {
            return self.post_where(|post| post.slug == slug);
        }

        let published: Vec<&Post> = self
            .posts
            .iter()
            .filter(|post| post.status == PostStatus::Published)
            .collect();
        ok(page(&published))
    }

    fn post_where(&self, predicate: impl Fn(&Post) -> bool) -> FallbackResponse {
        self.posts.iter().find(|post| predicate(post)).map_or_else(
            || {
                FallbackResponse::Envelope(json!({
                    "success": false,
                    "data": null,
                    "error": { "code": "NOT_FOUND", "message": "Post not found" }
                }))
            },
            ok,
        )
    }
}

impl FallbackProvider for DemoFallback {
    fn respond(&self, request: &RequestDescriptor) -> Option<FallbackResponse> {
        let endpoint = request.endpoint.as_str();
        let response = match endpoint {
            "/auth/login" => Self::login(request),
            "/auth/validate" => ok(true),
            "/auth/profile" if request.method == Method::PUT => Self::update_profile(request),
            "/auth/profile" => ok(demo_user()),
            _ if endpoint.starts_with("/posts") => self.posts(endpoint),
            _ if endpoint.starts_with("/categories") => ok(&self.categories),
            _ if endpoint.starts_with("/tags") => ok(&self.tags),
            _ => return None,
        };
        Some(response)
    }
}

fn ok(data: impl Serialize) -> FallbackResponse {
    FallbackResponse::Envelope(json!({ "success": true, "data": data }))
}

fn demo_user() -> JsonValue {
    json!({
        "id": 1,
        "username": "admin",
        "email": "admin@example.com",
        "displayName": "Admin User",
        "nickname": "Admin User",
        "role": "ADMIN",
        "avatar": "/placeholder.svg",
        "isActive": true
    })
}

fn page<T: Serialize>(items: &[T]) -> JsonValue {
    json!({
        "content": items,
        "totalPages": 1,
        "totalElements": items.len(),
        "size": 10,
        "number": 0,
        "first": true,
        "last": true,
        "pageable": {}
    })
}

/// Text following the first occurrence of `marker`, up to the next one
fn segment_after<'a>(endpoint: &'a str, marker: &str) -> Option<&'a str> {
    endpoint.split(marker).nth(1)
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuthorSummary;

    fn post(id: i64, slug: &str, status: PostStatus) -> Post {
        Post {
            id,
            title: format!("Post {id}"),
            slug: slug.to_string(),
            excerpt: None,
            content: None,
            status,
            is_featured: false,
            view_count: 0,
            created_at: "2024-01-01T00:00:00".to_string(),
            published_at: None,
            updated_at: "2024-01-01T00:00:00".to_string(),
            author: AuthorSummary {
                id: 1,
                username: "admin".to_string(),
                display_name: Some("Admin User".to_string()),
            },
            category: None,
            tags: vec![],
        }
    }

    fn envelope(response: Option<FallbackResponse>) -> JsonValue {
        match response {
            Some(FallbackResponse::Envelope(value)) => value,
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    fn demo() -> DemoFallback {
        DemoFallback::new().with_posts(vec![
            post(1, "hello-world", PostStatus::Published),
            post(2, "draft-notes", PostStatus::Draft),
        ])
    }

    #[test]
    fn test_login_accepts_demo_credentials() {
        let request = RequestDescriptor::post("/auth/login")
            .json(&json!({"username": "admin", "password": "admin"}))
            .unwrap();
        let body = envelope(demo().respond(&request));
        assert_eq!(body["data"]["token"], DEMO_TOKEN);
        assert_eq!(body["data"]["user"]["role"], "ADMIN");
        assert!(body["data"]["user"].get("displayName").is_none());
    }

    #[test]
    fn test_login_rejects_other_credentials() {
        let request = RequestDescriptor::post("/auth/login")
            .json(&json!({"username": "admin", "password": "hunter2"}))
            .unwrap();
        assert_eq!(
            demo().respond(&request),
            Some(FallbackResponse::Reject("Invalid credentials".to_string()))
        );
    }

    #[test]
    fn test_profile_update_merges_submitted_fields() {
        let request = RequestDescriptor::put("/auth/profile")
            .json(&json!({"nickname": "Konata", "email": ""}))
            .unwrap();
        let body = envelope(demo().respond(&request));
        assert_eq!(body["data"]["nickname"], "Konata");
        assert_eq!(body["data"]["email"], "admin@example.com");
    }

    #[test]
    fn test_public_listing_only_contains_published_posts() {
        let body = envelope(demo().respond(&RequestDescriptor::get("/posts?page=0&size=10")));
        assert_eq!(body["data"]["totalElements"], 1);
        assert_eq!(body["data"]["content"][0]["slug"], "hello-world");
    }

    #[test]
    fn test_admin_lookups() {
        let fallback = demo();

        let by_id = envelope(fallback.respond(&RequestDescriptor::get("/posts/admin/2")));
        assert_eq!(by_id["data"]["slug"], "draft-notes");

        let by_slug =
            envelope(fallback.respond(&RequestDescriptor::get("/posts/admin/slug/draft-notes")));
        assert_eq!(by_slug["data"]["id"], 2);

        let listing = envelope(fallback.respond(&RequestDescriptor::get("/posts/admin/all")));
        assert_eq!(listing["data"]["totalElements"], 2);

        let missing = envelope(fallback.respond(&RequestDescriptor::get("/posts/slug/nope")));
        assert_eq!(missing["success"], false);
        assert_eq!(missing["error"]["code"], "NOT_FOUND");
    }

    #[test]
    fn test_unknown_endpoints_have_no_fallback() {
        assert!(demo().respond(&RequestDescriptor::get("/media")).is_none());
        assert!(demo().respond(&RequestDescriptor::post("/auth/logout")).is_none());
        assert!(NoFallback.respond(&RequestDescriptor::get("/tags")).is_none());
    }
}
