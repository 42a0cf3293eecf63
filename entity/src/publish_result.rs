use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CategoryId, PostId};

/// Error codes produced locally; providers may return their own codes instead.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum ReturnCode {
    Ok,
    Error,
    /// The response could not be understood.
    ServerInternalError,
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnCode::Ok => write!(fmt, "OK"),
            ReturnCode::Error => write!(fmt, "Error"),
            ReturnCode::ServerInternalError => write!(fmt, "ServerInternalError"),
        }
    }
}

/// Outcome of a provider publish call.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishResult {
    Ok {
        post_id: PostId,
        /// Resolved categories, for providers that have them.
        categories: Option<Vec<CategoryId>>,
        response: Value,
    },
    Error {
        code: String,
        message: String,
        response: Option<Value>,
    },
}

impl PublishResult {
    pub fn error(code: impl ToString, message: impl Into<String>, response: Option<Value>) -> Self {
        PublishResult::Error {
            code: code.to_string(),
            message: message.into(),
            response,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PublishResult::Ok { .. })
    }

    pub fn post_id(&self) -> Option<&str> {
        match self {
            PublishResult::Ok { post_id, .. } => Some(post_id),
            PublishResult::Error { .. } => None,
        }
    }
}

/// Outcome of a media upload.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaUploadResult {
    Ok { url: String },
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_result_has_no_post_id() {
        let result = PublishResult::error(ReturnCode::ServerInternalError, "bad", None);
        assert!(!result.is_ok());
        assert!(result.post_id().is_none());
        if let PublishResult::Error { code, .. } = result {
            assert_eq!(code, "ServerInternalError");
        }
    }
}
