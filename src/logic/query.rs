use std::sync::Arc;

use crate::error::{WardrobeError, WardrobeResult};
use crate::model::{Id, WardrobeItem};
use crate::store::MetadataStore;

/// Read-only access to a principal's wardrobe
pub struct WardrobeQuery {
    metadata: Arc<dyn MetadataStore>,
}

impl WardrobeQuery {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Newest first
    pub async fn list(&self, owner_id: &Id) -> WardrobeResult<Vec<WardrobeItem>> {
        self.metadata
            .list_items_for_owner(owner_id)
            .await
            .map_err(WardrobeError::storage)
    }

    pub async fn get(&self, owner_id: &str, item_id: &Id) -> WardrobeResult<WardrobeItem> {
        let item = self
            .metadata
            .get_item(item_id)
            .await
            .map_err(WardrobeError::storage)?
            .ok_or_else(|| WardrobeError::NotFound(item_id.clone()))?;

        if item.owner_id != owner_id {
            return Err(WardrobeError::NotAuthorized);
        }
        Ok(item)
    }
}
