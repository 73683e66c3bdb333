//! Blog settings client methods

use super::{BlogClient, ClientError, FilePart};
use crate::types::{ApiResponse, AvatarUpload, BlogSettings, BlogSettingsUpdate, SettingEntry};

impl BlogClient {
    /// Settings visible to anonymous readers
    pub async fn get_public_settings(&self) -> Result<ApiResponse<BlogSettings>, ClientError> {
        self.get("/settings/public").await
    }

    /// Raw settings table (admin only)
    pub async fn get_all_settings(&self) -> Result<ApiResponse<Vec<SettingEntry>>, ClientError> {
        self.get("/settings").await
    }

    pub async fn update_settings(
        &self,
        update: &BlogSettingsUpdate,
    ) -> Result<ApiResponse<BlogSettings>, ClientError> {
        self.put("/settings", update).await
    }

    /// Upload the author avatar
    pub async fn upload_avatar(
        &self,
        file: FilePart,
    ) -> Result<ApiResponse<AvatarUpload>, ClientError> {
        self.upload_file("/settings/avatar", file, Vec::new(), "avatar")
            .await
    }
}
