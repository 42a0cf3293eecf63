//! Token manager with per-profile refresh locking.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::{FreshToken, InternalToken, Storage};
use crate::error::{token_error, Error, TokenErrorKind};
use crate::oauth::Client;

/// Token manager that hands out fresh tokens and persists refreshed ones.
///
/// A refresh holds a lock for its profile, so two requests that find the same stale
/// token produce one refresh call; the second one sees the stored result.
pub struct Manager<S: Storage> {
    storage: S,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: Storage> Manager<S> {
    /// Create a new token manager with the given storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            refresh_locks: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Get a fresh token for a profile, refreshing and persisting if needed.
    ///
    /// # Arguments
    ///
    /// * `client` - OAuth client of the profile's provider
    /// * `key` - Profile name
    ///
    /// # Returns
    ///
    /// A token that passed the freshness check, or `TokenErrorKind::NotFound` if the
    /// profile holds no token.
    pub async fn fresh_token(&self, client: &Client, key: &str) -> Result<FreshToken, Error> {
        let token = self.stored(key).await?;

        let token = match FreshToken::try_from(token) {
            Ok(fresh) => return Ok(fresh),
            Err(stale) => stale,
        };

        debug!("Token expired for profile {}, refreshing", key);

        let lock = self
            .refresh_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited for the lock
        let current = self.stored(key).await?;
        if current != token {
            if let Ok(fresh) = FreshToken::try_from(current.clone()) {
                debug!("Token was refreshed by another request");
                return Ok(fresh);
            }
        }

        let fresh = client.ensure_fresh_token(&current).await?;
        if fresh.token() != &current {
            self.storage.store(key, fresh.token().clone()).await?;
            debug!("Refreshed token stored for profile {}", key);
        }

        Ok(fresh)
    }

    /// Store a token for a profile.
    pub async fn store_token(&self, key: &str, token: InternalToken) -> Result<(), Error> {
        self.storage.store(key, token).await
    }

    /// Clear the token of a profile.
    pub async fn delete_token(&self, key: &str) -> Result<(), Error> {
        self.storage.delete(key).await
    }

    /// Get the stored token for a profile (may be stale).
    pub async fn get_token(&self, key: &str) -> Result<Option<InternalToken>, Error> {
        self.storage.get(key).await
    }

    async fn stored(&self, key: &str) -> Result<InternalToken, Error> {
        self.storage.get(key).await?.ok_or_else(|| {
            token_error(
                TokenErrorKind::NotFound,
                &format!("No token stored for profile {}", key),
            )
        })
    }
}
