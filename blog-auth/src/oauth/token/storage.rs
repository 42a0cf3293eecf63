//! Token storage trait for persisting OAuth tokens.

use async_trait::async_trait;

use super::InternalToken;
use crate::error::Error;

/// Trait for storing and retrieving OAuth tokens.
///
/// Tokens are keyed by the name of the blog profile that owns them. Implementations
/// replace the whole token on `store`; nothing updates a stored token in place.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store (replace) the token for a profile.
    ///
    /// # Arguments
    ///
    /// * `key` - Profile name
    /// * `token` - The token to store
    async fn store(&self, key: &str, token: InternalToken) -> Result<(), Error>;

    /// Retrieve the token for a profile.
    ///
    /// # Returns
    ///
    /// `Some(InternalToken)` if found (possibly stale), `None` if the profile has never
    /// been authorized or was de-authorized.
    async fn get(&self, key: &str) -> Result<Option<InternalToken>, Error>;

    /// Clear the token for a profile.
    async fn delete(&self, key: &str) -> Result<(), Error>;
}
