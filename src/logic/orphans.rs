//! Read-only detection of blobs that lost their metadata record.
//!
//! Orphans come from aborted commits and from deletions whose blob could not
//! be reclaimed. Nothing here deletes anything.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{WardrobeError, WardrobeResult};
use crate::model::{BlobPath, Id};
use crate::store::{BlobStore, MetadataStore};

pub struct OrphanScanner {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl OrphanScanner {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    /// Blob ids under the owner's folder that no metadata record accounts for
    pub async fn find_orphans(&self, owner_id: &Id) -> WardrobeResult<Vec<String>> {
        let blob_ids = self
            .blobs
            .list(&BlobPath::owner_prefix(owner_id))
            .await
            .map_err(WardrobeError::storage)?;
        let items = self
            .metadata
            .list_items_for_owner(owner_id)
            .await
            .map_err(WardrobeError::storage)?;

        let item_ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        let referenced: HashSet<&str> = items.iter().map(|i| i.blob_ref.blob_id.as_str()).collect();

        let orphans: Vec<String> = blob_ids
            .into_iter()
            .filter(|blob_id| !referenced.contains(blob_id.as_str()))
            .filter(|blob_id| match BlobPath::parse(blob_id) {
                Some(path) => path.owner_id == *owner_id && !item_ids.contains(path.item_id.as_str()),
                None => {
                    log::debug!("Skipping blob {} with unrecognized path", blob_id);
                    false
                }
            })
            .collect();

        if !orphans.is_empty() {
            log::info!("Found {} orphaned blob(s) for {}", orphans.len(), owner_id);
        }
        Ok(orphans)
    }
}
