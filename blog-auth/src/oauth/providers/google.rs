//! Google OAuth endpoints used for Blogger.

use crate::oauth::ProviderEndpoints;

pub const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const VALIDATE_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Full read/write access to the user's Blogger account.
pub const BLOGGER_SCOPE: &str = "https://www.googleapis.com/auth/blogger";

/// Production Google endpoints.
pub fn endpoints() -> ProviderEndpoints {
    ProviderEndpoints {
        authorize_url: AUTHORIZE_URL.to_string(),
        token_url: TOKEN_URL.to_string(),
        validate_url: VALIDATE_URL.to_string(),
    }
}
