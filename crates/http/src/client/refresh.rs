//! Single-flight token refresh

use super::BlogClient;
use futures::FutureExt;
use futures::future::WeakShared;
use std::sync::PoisonError;

impl BlogClient {
    /// Refresh the token, joining a refresh already in flight
    ///
    /// Resolves to `true` when the backend issued a new token and it was
    /// stored. Every concurrent caller observes the same outcome.
    ///
    /// The slot only keeps a weak handle: a refresh whose waiters have all
    /// gone away is dropped, and the next caller starts a fresh one.
    pub(crate) async fn try_refresh_token(&self) -> bool {
        let pending = {
            let mut slot = self
                .inner
                .pending_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(pending) = slot.as_ref().and_then(WeakShared::upgrade) {
                debug!("joining in-flight token refresh");
                pending
            } else {
                let client = self.clone();
                let refresh = async move {
                    let refreshed = match client.refresh_token().await {
                        Ok(response) => {
                            response.success
                                && response.data.is_some_and(|token| !token.trim().is_empty())
                        }
                        Err(err) => {
                            warn!(error = %err, "token refresh failed");
                            false
                        }
                    };
                    client
                        .inner
                        .pending_refresh
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    refreshed
                }
                .boxed()
                .shared();

                *slot = refresh.downgrade();
                refresh
            }
        };

        pending.await
    }
}
