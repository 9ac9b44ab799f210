mod file_store;
mod memory_store;
mod store_error;

use async_trait::async_trait;
use eyre::Result;
pub use file_store::*;
pub use memory_store::*;
use serde_json::Value;
pub use store_error::*;

/// Durable key-value storage shared by every instance, like the extension's storage
/// area. Writes are independent last-write-wins puts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, value: Value) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<Value>>;
}
