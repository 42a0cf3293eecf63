//! WordPress.com OAuth endpoints.

use crate::oauth::ProviderEndpoints;

pub const AUTHORIZE_URL: &str = "https://public-api.wordpress.com/oauth2/authorize";
pub const TOKEN_URL: &str = "https://public-api.wordpress.com/oauth2/token";
pub const VALIDATE_URL: &str = "https://public-api.wordpress.com/oauth2/token-info";

/// Grants access to every site of the account, so a single token serves all profiles.
pub const GLOBAL_SCOPE: &str = "global";

/// Production WordPress.com endpoints.
pub fn endpoints() -> ProviderEndpoints {
    ProviderEndpoints {
        authorize_url: AUTHORIZE_URL.to_string(),
        token_url: TOKEN_URL.to_string(),
        validate_url: VALIDATE_URL.to_string(),
    }
}
