//! Signed-in user state on top of a client
//!
//! A `Session` caches the current user. It listens to the client's token
//! store, so a token cleared anywhere (logout, a rejected 401) also drops the
//! cached user.

use super::{BlogClient, ClientError, ListenerId, TokenEvent};
use crate::types::User;
use std::sync::{Arc, Mutex, PoisonError};

type SharedUser = Arc<Mutex<Option<User>>>;

/// Current user of a [`BlogClient`]
pub struct Session {
    client: BlogClient,
    user: SharedUser,
    listener: ListenerId,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start an empty session; call [`Session::refresh_user`] to load a stored login
    pub fn new(client: BlogClient) -> Self {
        let user: SharedUser = Arc::default();
        let cached = Arc::clone(&user);
        let listener = client.tokens().subscribe(move |event| {
            if event == TokenEvent::Removed {
                cached.lock().unwrap_or_else(PoisonError::into_inner).take();
            }
        });

        Self {
            client,
            user,
            listener,
        }
    }

    pub fn client(&self) -> &BlogClient {
        &self.client
    }

    /// Cached user, if signed in
    pub fn user(&self) -> Option<User> {
        self.user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Reload the user from the backend
    ///
    /// Without a stored token, or when the profile cannot be fetched, the
    /// session ends up signed out.
    pub async fn refresh_user(&self) -> Option<User> {
        let user = if self.client.is_authenticated() {
            match self.client.get_profile().await {
                Ok(response) if response.success => response.data,
                Ok(response) => {
                    debug!(error = ?response.error_message(), "profile unavailable");
                    None
                }
                Err(err) => {
                    warn!(error = %err, "failed to fetch user profile");
                    None
                }
            }
        } else {
            None
        };

        self.set_user(user.clone());
        user
    }

    /// Log in and cache the returned user
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let response = self.client.login(username, password).await?;
        match response.data.filter(|_| response.success) {
            Some(login) => {
                self.set_user(Some(login.user.clone()));
                Ok(login.user)
            }
            None => {
                let message = response
                    .error
                    .map(|error| error.message)
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "Login failed".to_string());
                Err(ClientError::AuthenticationFailed(message))
            }
        }
    }

    /// Log out; the cached user is cleared even if the backend call fails
    pub async fn logout(&self) -> Result<(), ClientError> {
        let outcome = self.client.logout().await;
        self.set_user(None);
        outcome
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.client.tokens().unsubscribe(self.listener);
    }
}
