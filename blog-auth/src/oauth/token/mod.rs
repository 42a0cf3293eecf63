//! OAuth token model, freshness gate, storage and refresh coordination.

mod manager;
mod storage;
mod tokens;

pub use manager::Manager;
pub use storage::Storage;
pub use tokens::{FreshToken, InternalToken, PlainToken, TokenResponse, EXPIRY_MARGIN_SECS};
