//! Theme client methods

use super::{BlogClient, ClientError};
use crate::types::{ApiResponse, Theme};
use serde_json::{Map, Value as JsonValue, json};

impl BlogClient {
    pub async fn get_themes(&self) -> Result<ApiResponse<Vec<Theme>>, ClientError> {
        self.get("/themes").await
    }

    pub async fn activate_theme(&self, theme_id: i64) -> Result<ApiResponse<Theme>, ClientError> {
        self.post_empty(format!("/themes/{theme_id}/activate"))
            .await
    }

    /// Replace a theme's configuration object
    pub async fn update_theme_config(
        &self,
        theme_id: i64,
        config: &Map<String, JsonValue>,
    ) -> Result<ApiResponse<Theme>, ClientError> {
        self.put(format!("/themes/{theme_id}/config"), &json!({ "config": config }))
            .await
    }
}
