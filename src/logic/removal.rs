use std::sync::Arc;

use crate::error::{WardrobeError, WardrobeResult};
use crate::model::{BlobPath, Id};
use crate::store::{BlobStore, MetadataStore};

/// Deletes an item on behalf of its owner.
///
/// The metadata record is what makes an item visible, so its deletion must
/// succeed; the blob is reclaimed best-effort and may leak.
pub struct DeletionCompensator {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DeletionCompensator {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    pub async fn remove(
        &self,
        owner_id: &str,
        item_id: &Id,
        blob_hint: Option<&str>,
    ) -> WardrobeResult<()> {
        let item = self
            .metadata
            .get_item(item_id)
            .await
            .map_err(WardrobeError::storage)?
            .ok_or_else(|| WardrobeError::NotFound(item_id.clone()))?;

        if item.owner_id != owner_id {
            log::warn!("{} attempted to delete an item it does not own", owner_id);
            return Err(WardrobeError::NotAuthorized);
        }

        let blob_id = match blob_hint.map(str::trim).filter(|h| !h.is_empty()) {
            // A hint must name a blob of this very item in the owner's folder
            Some(hint) if hint_names_item(hint, owner_id, &item.id) => hint,
            Some(hint) => {
                log::warn!(
                    "Ignoring blob hint {:?} that does not belong to item {} of {}",
                    hint,
                    item.id,
                    owner_id
                );
                item.blob_ref.blob_id.as_str()
            }
            None => item.blob_ref.blob_id.as_str(),
        };

        if let Err(e) = self.blobs.delete(blob_id).await {
            log::warn!(
                "Blob {} of item {} not reclaimed, continuing: {:#}",
                blob_id,
                item.id,
                e
            );
        }

        let deleted = self
            .metadata
            .delete_item(&item.id)
            .await
            .map_err(WardrobeError::storage)?;
        if !deleted {
            log::debug!("Item {} was already gone when deleting", item.id);
        }

        log::info!("Removed wardrobe item {} for {}", item.id, owner_id);
        Ok(())
    }
}

fn hint_names_item(hint: &str, owner_id: &str, item_id: &str) -> bool {
    BlobPath::parse(hint)
        .map(|path| path.owner_id == owner_id && path.item_id == item_id)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ingest::IngestOrchestrator;
    use crate::model::{CommitCandidate, TaxonomyCategory, WardrobeItem};
    use crate::store::{MemoryBlobStore, MemoryMetadataStore};

    struct Fixture {
        metadata: Arc<MemoryMetadataStore>,
        blobs: Arc<MemoryBlobStore>,
        compensator: DeletionCompensator,
    }

    async fn fixture_with_item(owner: &str) -> (Fixture, WardrobeItem) {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let orchestrator = IngestOrchestrator::new(metadata.clone(), blobs.clone());
        let mut items = orchestrator
            .commit(owner, vec![CommitCandidate::new("Quần jean", vec![1, 2, 3])])
            .await
            .unwrap();
        let compensator = DeletionCompensator::new(metadata.clone(), blobs.clone());
        (
            Fixture {
                metadata,
                blobs,
                compensator,
            },
            items.remove(0),
        )
    }

    #[tokio::test]
    async fn test_owner_removes_item_and_blob() {
        let (fx, item) = fixture_with_item("U1").await;

        fx.compensator.remove("U1", &item.id, None).await.unwrap();

        assert!(fx.metadata.is_empty());
        assert!(!fx.blobs.contains(&item.blob_ref.blob_id));
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let (fx, _item) = fixture_with_item("U1").await;

        let err = fx
            .compensator
            .remove("U1", &"missing".to_string(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(fx.metadata.len(), 1);
    }

    #[tokio::test]
    async fn test_non_owner_is_rejected_and_nothing_changes() {
        let (fx, item) = fixture_with_item("U1").await;

        let err = fx.compensator.remove("U2", &item.id, None).await.unwrap_err();
        assert_eq!(err.kind(), "not_authorized");
        assert!(!err.to_string().contains(&item.id));
        assert_eq!(fx.metadata.len(), 1);
        assert!(fx.blobs.contains(&item.blob_ref.blob_id));
    }

    #[tokio::test]
    async fn test_blob_failure_does_not_block_metadata_delete() {
        let (fx, item) = fixture_with_item("U1").await;
        fx.blobs.fail_deletes(true);

        fx.compensator.remove("U1", &item.id, None).await.unwrap();

        assert!(fx.metadata.is_empty());
        // Leaked, to be picked up by the orphan sweep
        assert!(fx.blobs.contains(&item.blob_ref.blob_id));
    }

    #[tokio::test]
    async fn test_metadata_failure_is_reported() {
        let (fx, item) = fixture_with_item("U1").await;
        fx.metadata.fail_writes(true);

        let err = fx.compensator.remove("U1", &item.id, None).await.unwrap_err();
        assert_eq!(err.kind(), "storage_failure");
    }

    #[tokio::test]
    async fn test_blob_hint_outside_owner_folder_is_ignored() {
        let (fx, item) = fixture_with_item("U1").await;
        let foreign = format!("{}top/someone-else.png", BlobPath::owner_prefix("U2"));
        fx.blobs.put(&foreign, vec![9]).await.unwrap();

        fx.compensator
            .remove("U1", &item.id, Some(foreign.as_str()))
            .await
            .unwrap();

        assert!(fx.blobs.contains(&foreign));
        assert!(!fx.blobs.contains(&item.blob_ref.blob_id));
        assert!(fx.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_blob_hint_naming_another_item_is_ignored() {
        let (fx, item) = fixture_with_item("U1").await;
        let orchestrator = IngestOrchestrator::new(fx.metadata.clone(), fx.blobs.clone());
        let other = orchestrator
            .commit("U1", vec![CommitCandidate::new("Áo thun", vec![4, 5, 6])])
            .await
            .unwrap()
            .remove(0);

        fx.compensator
            .remove("U1", &item.id, Some(other.blob_ref.blob_id.as_str()))
            .await
            .unwrap();

        // The other item keeps its image, this item's blob is reclaimed
        assert!(fx.blobs.contains(&other.blob_ref.blob_id));
        assert!(!fx.blobs.contains(&item.blob_ref.blob_id));
        assert_eq!(fx.metadata.len(), 1);
    }

    #[tokio::test]
    async fn test_blob_hint_naming_the_item_is_used() {
        let (fx, item) = fixture_with_item("U1").await;
        // Same item, stored under a different category folder
        let hinted = BlobPath::new(
            "U1",
            TaxonomyCategory::Top,
            item.created_at,
            0,
            &item.id,
        )
        .to_string();
        fx.blobs.put(&hinted, vec![9]).await.unwrap();

        fx.compensator
            .remove("U1", &item.id, Some(hinted.as_str()))
            .await
            .unwrap();

        assert!(!fx.blobs.contains(&hinted));
        assert!(fx.metadata.is_empty());
    }

    #[test]
    fn test_hint_must_parse_to_owner_and_item() {
        let path = BlobPath::new("U1", TaxonomyCategory::Shoes, chrono::Utc::now(), 0, "item-1")
            .to_string();
        assert!(hint_names_item(&path, "U1", "item-1"));
        assert!(!hint_names_item(&path, "U1", "item-2"));
        assert!(!hint_names_item(&path, "U2", "item-1"));
        assert!(!hint_names_item("wardrobe/U1/top/replaced.png", "U1", "item-1"));
    }
}
