//! Post API client methods

use super::query::{PageParams, PostSearch, QueryParams};
use super::{BlogClient, ClientError};
use crate::types::{ApiResponse, PageResponse, Post, PostInput, PostUpdate};
use serde_json::{Value as JsonValue, json};

fn paged(path: &str, paging: &PageParams) -> String {
    let mut query = QueryParams::new();
    paging.write(&mut query);
    query.append_to(path)
}

impl BlogClient {
    /// Published posts, newest first by default on the backend
    pub async fn get_posts(
        &self,
        paging: &PageParams,
    ) -> Result<ApiResponse<PageResponse<Post>>, ClientError> {
        self.get(paged("/posts", paging)).await
    }

    /// All posts regardless of status
    pub async fn get_admin_posts(
        &self,
        paging: &PageParams,
    ) -> Result<ApiResponse<PageResponse<Post>>, ClientError> {
        self.get(paged("/posts/admin/all", paging)).await
    }

    pub async fn get_post_by_id(&self, id: i64) -> Result<ApiResponse<Post>, ClientError> {
        self.get(format!("/posts/{id}")).await
    }

    pub async fn get_admin_post_by_id(&self, id: i64) -> Result<ApiResponse<Post>, ClientError> {
        self.get(format!("/posts/admin/{id}")).await
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<ApiResponse<Post>, ClientError> {
        self.get(format!("/posts/slug/{slug}")).await
    }

    pub async fn get_admin_post_by_slug(
        &self,
        slug: &str,
    ) -> Result<ApiResponse<Post>, ClientError> {
        self.get(format!("/posts/admin/slug/{slug}")).await
    }

    /// Search published posts
    pub async fn search_posts(
        &self,
        search: &PostSearch,
    ) -> Result<ApiResponse<PageResponse<Post>>, ClientError> {
        self.get(search.to_query().always_append_to("/posts/search"))
            .await
    }

    /// Search all posts, drafts included
    pub async fn search_admin_posts(
        &self,
        search: &PostSearch,
    ) -> Result<ApiResponse<PageResponse<Post>>, ClientError> {
        self.get(search.to_query().always_append_to("/posts/admin/search"))
            .await
    }

    pub async fn create_post(&self, post: &PostInput) -> Result<ApiResponse<Post>, ClientError> {
        self.post("/posts", post).await
    }

    pub async fn update_post(
        &self,
        id: i64,
        update: &PostUpdate,
    ) -> Result<ApiResponse<Post>, ClientError> {
        self.put(format!("/posts/{id}"), update).await
    }

    pub async fn delete_post(&self, id: i64) -> Result<ApiResponse<JsonValue>, ClientError> {
        self.delete(format!("/posts/{id}")).await
    }

    pub async fn publish_post(&self, id: i64) -> Result<ApiResponse<Post>, ClientError> {
        self.post_empty(format!("/posts/{id}/publish")).await
    }

    pub async fn unpublish_post(&self, id: i64) -> Result<ApiResponse<Post>, ClientError> {
        self.post_empty(format!("/posts/{id}/unpublish")).await
    }

    /// Replace the tags attached to a post
    pub async fn set_post_tags(
        &self,
        post_id: i64,
        tag_ids: &[i64],
    ) -> Result<ApiResponse<Post>, ClientError> {
        self.put(format!("/posts/{post_id}/tags"), &json!({ "tagIds": tag_ids }))
            .await
    }
}
