//! Tag API client methods

use super::query::{PostFilter, QueryParams};
use super::{BlogClient, ClientError};
use crate::types::{ApiResponse, PageResponse, Post, SmartTagInput, Tag, TagInput, TagUpdate};
use serde_json::{Value as JsonValue, json};

impl BlogClient {
    pub async fn get_tags(&self) -> Result<ApiResponse<Vec<Tag>>, ClientError> {
        self.get("/tags").await
    }

    pub async fn get_tag_by_id(&self, id: i64) -> Result<ApiResponse<Tag>, ClientError> {
        self.get(format!("/tags/{id}")).await
    }

    pub async fn get_tag_by_slug(&self, slug: &str) -> Result<ApiResponse<Tag>, ClientError> {
        self.get(format!("/tags/slug/{slug}")).await
    }

    /// Most used tags (the backend default is 10)
    pub async fn get_popular_tags(&self, limit: u32) -> Result<ApiResponse<Vec<Tag>>, ClientError> {
        self.get(format!("/tags/popular?limit={limit}")).await
    }

    /// Search tags by name; an empty query lists every tag
    pub async fn search_tags(
        &self,
        query: &str,
        page: u32,
        size: u32,
        ignore_case: bool,
    ) -> Result<ApiResponse<PageResponse<Tag>>, ClientError> {
        let mut params = QueryParams::new();
        params
            .push_non_empty("q", Some(query))
            .push("page", page)
            .push("size", size)
            .push("ignoreCase", ignore_case);
        self.get(params.always_append_to("/tags/search")).await
    }

    /// Autocomplete suggestions for a partial tag name
    pub async fn get_tag_suggestions(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<ApiResponse<Vec<Tag>>, ClientError> {
        self.get(format!(
            "/tags/suggestions?q={}&limit={limit}",
            urlencoding::encode(query)
        ))
        .await
    }

    pub async fn get_tag_posts(
        &self,
        id: i64,
        filter: &PostFilter,
    ) -> Result<ApiResponse<PageResponse<Post>>, ClientError> {
        self.get(filter.to_query().append_to(&format!("/tags/{id}/posts")))
            .await
    }

    pub async fn create_tag(&self, tag: &TagInput) -> Result<ApiResponse<Tag>, ClientError> {
        self.post("/tags", tag).await
    }

    pub async fn update_tag(
        &self,
        id: i64,
        update: &TagUpdate,
    ) -> Result<ApiResponse<Tag>, ClientError> {
        self.put(format!("/tags/{id}"), update).await
    }

    /// Delete a tag; `force` also detaches it from posts
    pub async fn delete_tag(
        &self,
        id: i64,
        force: bool,
    ) -> Result<ApiResponse<JsonValue>, ClientError> {
        self.delete(format!("/tags/{id}?force={force}")).await
    }

    pub async fn bulk_create_tags(
        &self,
        names: &[String],
    ) -> Result<ApiResponse<Vec<Tag>>, ClientError> {
        self.post("/tags/bulk", &json!({ "names": names })).await
    }

    /// Create a tag, or return the existing one with the same name
    pub async fn smart_create_tag(
        &self,
        tag: &SmartTagInput,
    ) -> Result<ApiResponse<Tag>, ClientError> {
        self.post("/tags/smart-create", tag).await
    }
}
