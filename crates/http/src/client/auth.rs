//! Authentication API client methods

use super::{BlogClient, ClientError, RequestDescriptor, RequestMeta};
use crate::types::{ApiResponse, LoginRequest, LoginResponse, ProfileUpdate, User};
use serde_json::Value as JsonValue;

/// Error codes after which a profile update is retried on `/users/me`
const PROFILE_RETRY_CODES: [&str; 4] = ["UNAUTHORIZED", "401", "404", "405"];

impl BlogClient {
    /// Log in and store the issued token
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<ApiResponse<LoginResponse>, ClientError> {
        let credentials = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: ApiResponse<LoginResponse> = self.post("/auth/login", &credentials).await?;

        if let Some(data) = response.data.as_ref().filter(|_| response.success) {
            self.inner.tokens.set_token(&data.token)?;
            info!(username = %data.user.username, "logged in");
        }

        Ok(response)
    }

    /// Log out; the local token is removed even when the backend call fails
    pub async fn logout(&self) -> Result<(), ClientError> {
        let outcome = self.post_empty::<JsonValue>("/auth/logout").await;
        self.inner.tokens.remove_token()?;
        info!("logged out");
        outcome.map(|_| ())
    }

    /// Get the current user's profile
    pub async fn get_profile(&self) -> Result<ApiResponse<User>, ClientError> {
        self.get("/auth/profile").await
    }

    /// Ask the backend whether the stored token is still valid
    pub async fn validate_token(&self) -> Result<ApiResponse<bool>, ClientError> {
        self.get("/auth/validate").await
    }

    /// Exchange the stored token for a fresh one
    ///
    /// Never triggers another refresh and never clears the token on failure.
    pub async fn refresh_token(&self) -> Result<ApiResponse<String>, ClientError> {
        let response: ApiResponse<String> = self
            .request(RequestDescriptor::post("/auth/refresh"), RequestMeta::unattended())
            .await?;

        let issued = response
            .data
            .as_deref()
            .filter(|token| response.success && !token.is_empty());
        if let Some(token) = issued {
            self.inner.tokens.set_token(token)?;
            debug!("token refreshed");
        }

        Ok(response)
    }

    /// Update the current user's profile
    ///
    /// Falls back to `/users/me` for backends without `PUT /auth/profile`. A
    /// token returned alongside the user replaces the stored one.
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<ApiResponse<User>, ClientError> {
        let mut response = self.put_profile("/auth/profile", update).await?;

        let retry = !response.success
            && response
                .error
                .as_ref()
                .is_some_and(|error| PROFILE_RETRY_CODES.contains(&error.code.as_str()));
        if retry {
            debug!("profile endpoint unavailable, retrying on /users/me");
            response = self.put_profile("/users/me", update).await?;
        }

        let ApiResponse {
            success,
            data,
            message,
            error,
        } = response;

        let user = match data {
            Some(mut data) if success => {
                if let Some(token) = data
                    .get("token")
                    .and_then(JsonValue::as_str)
                    .filter(|token| !token.is_empty())
                {
                    self.inner.tokens.set_token(token)?;
                }
                let user = if data.get("user").is_some_and(|user| !user.is_null()) {
                    data["user"].take()
                } else {
                    data
                };
                Some(serde_json::from_value(user)?)
            }
            _ => None,
        };

        Ok(ApiResponse {
            success,
            data: user,
            message,
            error,
        })
    }

    /// Whether a token is currently stored
    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.get_token().is_some()
    }

    async fn put_profile(
        &self,
        endpoint: &str,
        update: &ProfileUpdate,
    ) -> Result<ApiResponse<JsonValue>, ClientError> {
        let descriptor = RequestDescriptor::put(endpoint).json(update)?;
        self.request(descriptor, RequestMeta::new().suppress_auth_clear())
            .await
    }
}
