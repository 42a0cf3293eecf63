//! Endpoint constants for the supported providers.

pub mod google;
pub mod wordpress;
