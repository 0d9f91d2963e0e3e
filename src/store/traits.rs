use crate::model::{BlobRef, Id, WardrobeItem};
use anyhow::Result;

/// Structured records for wardrobe items
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_item(&self, id: &Id) -> Result<Option<WardrobeItem>>;
    /// All items of one owner, newest first
    async fn list_items_for_owner(&self, owner_id: &Id) -> Result<Vec<WardrobeItem>>;
    /// Persist every item or none of them
    async fn insert_items(&self, items: &[WardrobeItem]) -> Result<()>;
    /// Returns false when no record had this id
    async fn delete_item(&self, id: &Id) -> Result<bool>;
}

/// Image bytes, addressed by path. No multi-object transactions.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef>;
    async fn delete(&self, blob_id: &str) -> Result<()>;
    /// Blob ids whose path starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
