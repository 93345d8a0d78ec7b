//! Subscriber directory: who receives alert digests for a test.

use async_trait::async_trait;

use crate::store::StoreResult;

#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Current subscriber addresses for the test.
    async fn subscribers(&self, test_name: &str) -> StoreResult<Vec<String>>;
}
