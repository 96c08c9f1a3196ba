//! Local cache port - small string records that survive restarts

use async_trait::async_trait;

use crate::domain::result::Result;

/// Local persistent key-value cache
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a record; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}
