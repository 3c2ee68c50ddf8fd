use async_trait::async_trait;

use crate::models::RawListing;

/// Supplier of raw listings.
///
/// Transport and decode failures are logged by the implementation and
/// reported as an empty batch, the same as "nothing new".
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch(&self) -> Vec<RawListing>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
