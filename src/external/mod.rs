//! Outbound integrations: HTTP client construction and listing sources.

pub mod apify;
pub mod client;
pub mod source;

pub use apify::ApifySource;
pub use client::build_http_client;
pub use source::JobSource;
