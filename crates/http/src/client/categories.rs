//! Category API client methods

use super::query::{CategoryQuery, PostFilter};
use super::{BlogClient, ClientError};
use crate::types::{
    ApiResponse, Category, CategoryInput, CategoryOrder, CategoryStats, CategoryUpdate,
    PageResponse, Post,
};
use serde_json::{Value as JsonValue, json};

impl BlogClient {
    pub async fn get_categories(
        &self,
        query: CategoryQuery,
    ) -> Result<ApiResponse<Vec<Category>>, ClientError> {
        self.get(query.to_query().append_to("/categories")).await
    }

    pub async fn get_category_by_id(&self, id: i64) -> Result<ApiResponse<Category>, ClientError> {
        self.get(format!("/categories/{id}")).await
    }

    pub async fn get_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<ApiResponse<Category>, ClientError> {
        self.get(format!("/categories/slug/{slug}")).await
    }

    /// Category hierarchy, optionally including categories without posts
    pub async fn get_category_tree(
        &self,
        include_empty: bool,
    ) -> Result<ApiResponse<Vec<Category>>, ClientError> {
        self.get(format!("/categories/tree?includeEmpty={include_empty}"))
            .await
    }

    pub async fn get_category_posts(
        &self,
        id: i64,
        filter: &PostFilter,
    ) -> Result<ApiResponse<PageResponse<Post>>, ClientError> {
        self.get(filter.to_query().append_to(&format!("/categories/{id}/posts")))
            .await
    }

    pub async fn create_category(
        &self,
        category: &CategoryInput,
    ) -> Result<ApiResponse<Category>, ClientError> {
        self.post("/categories", category).await
    }

    pub async fn update_category(
        &self,
        id: i64,
        update: &CategoryUpdate,
    ) -> Result<ApiResponse<Category>, ClientError> {
        self.put(format!("/categories/{id}"), update).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<ApiResponse<JsonValue>, ClientError> {
        self.delete(format!("/categories/{id}")).await
    }

    /// Persist a new sort order
    pub async fn reorder_categories(
        &self,
        orders: &[CategoryOrder],
    ) -> Result<ApiResponse<JsonValue>, ClientError> {
        self.patch("/categories/reorder", &json!({ "orders": orders }))
            .await
    }

    pub async fn get_category_stats(&self) -> Result<ApiResponse<CategoryStats>, ClientError> {
        self.get("/categories/stats").await
    }
}
