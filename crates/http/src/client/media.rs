//! Media library client methods

use super::query::MediaQuery;
use super::{BlogClient, ClientError, FilePart};
use crate::types::{ApiResponse, MediaFile, MediaType, PageResponse};
use serde_json::Value as JsonValue;

/// Optional metadata sent with a media upload
#[derive(Debug, Clone, Default)]
pub struct MediaUpload {
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub media_type: Option<MediaType>,
}

impl MediaUpload {
    fn into_fields(self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(description) = self.description.filter(|value| !value.is_empty()) {
            fields.push(("description".to_string(), description));
        }
        if let Some(alt_text) = self.alt_text.filter(|value| !value.is_empty()) {
            fields.push(("altText".to_string(), alt_text));
        }
        if let Some(media_type) = self.media_type {
            fields.push(("type".to_string(), media_type.as_str().to_string()));
        }
        fields
    }
}

impl BlogClient {
    pub async fn get_media(
        &self,
        query: &MediaQuery,
    ) -> Result<ApiResponse<PageResponse<MediaFile>>, ClientError> {
        self.get(query.to_query().append_to("/media")).await
    }

    /// Upload a file to the media library
    pub async fn upload_media(
        &self,
        file: FilePart,
        metadata: MediaUpload,
    ) -> Result<ApiResponse<MediaFile>, ClientError> {
        self.upload_file("/media/upload", file, metadata.into_fields(), "file")
            .await
    }

    pub async fn delete_media(&self, id: i64) -> Result<ApiResponse<JsonValue>, ClientError> {
        self.delete(format!("/media/{id}")).await
    }
}
