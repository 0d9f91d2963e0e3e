use anyhow::{anyhow, bail, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::model::{BlobRef, Id, WardrobeItem};
use crate::store::traits::{BlobStore, MetadataStore};

/// In-process metadata store for development and tests
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    items: RwLock<HashMap<Id, WardrobeItem>>,
    fail_writes: AtomicBool,
    batch_writes: AtomicUsize,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert/delete fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of batch writes attempted so far
    pub fn batch_writes(&self) -> usize {
        self.batch_writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait::async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_item(&self, id: &Id) -> Result<Option<WardrobeItem>> {
        Ok(self.items.read().get(id).cloned())
    }

    async fn list_items_for_owner(&self, owner_id: &Id) -> Result<Vec<WardrobeItem>> {
        let mut items: Vec<WardrobeItem> = self
            .items
            .read()
            .values()
            .filter(|item| &item.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn insert_items(&self, items: &[WardrobeItem]) -> Result<()> {
        self.batch_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("metadata store rejected batch write");
        }

        // Validate the whole batch before touching the map
        let mut guard = self.items.write();
        for item in items {
            if guard.contains_key(&item.id) {
                bail!("duplicate wardrobe item id {}", item.id);
            }
        }
        for item in items {
            guard.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }

    async fn delete_item(&self, id: &Id) -> Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("metadata store rejected delete of {}", id);
        }
        Ok(self.items.write().remove(id).is_some())
    }
}

/// In-process blob store. Failure switches let tests drive partial-failure paths.
#[derive(Debug)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    base_url: String,
    /// Successful puts allowed before puts start failing
    puts_before_failure: RwLock<Option<usize>>,
    fail_deletes: AtomicBool,
    put_calls: AtomicUsize,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(BTreeMap::new()),
            base_url: "memory://blobs".to_string(),
            puts_before_failure: RwLock::new(None),
            fail_deletes: AtomicBool::new(false),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Let `count` more puts succeed, then fail every put after that
    pub fn fail_puts_after(&self, count: usize) {
        *self.puts_before_failure.write() = Some(count);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, blob_id: &str) -> bool {
        self.blobs.read().contains_key(blob_id)
    }

    pub fn blob_ids(&self) -> Vec<String> {
        self.blobs.read().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut remaining = self.puts_before_failure.write();
            if let Some(count) = remaining.as_mut() {
                if *count == 0 {
                    return Err(anyhow!("blob store rejected upload of {}", path));
                }
                *count -= 1;
            }
        }

        self.blobs.write().insert(path.to_string(), bytes);
        Ok(BlobRef {
            url: format!("{}/{}", self.base_url, path),
            blob_id: path.to_string(),
        })
    }

    async fn delete(&self, blob_id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("blob store rejected delete of {}", blob_id);
        }
        self.blobs.write().remove(blob_id);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .blobs
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
