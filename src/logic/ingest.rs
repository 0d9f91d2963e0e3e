//! Turns confirmed candidates into stored wardrobe items.
//!
//! Blobs are uploaded one candidate at a time (or a few at a time, see
//! `upload_concurrency`), then every metadata record of the call is written
//! in a single atomic batch. The blob store has no transactions: when an
//! upload or the batch write fails, blobs already uploaded stay behind as
//! orphans. They are logged and can be found again through their paths
//! (see `logic::orphans`).

use chrono::{DateTime, DurationRound, Utc};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{WardrobeError, WardrobeResult};
use crate::logic::category;
use crate::model::{
    generate_id, BlobPath, CommitCandidate, SourceTag, WardrobeItem, UNKNOWN_COLOR,
};
use crate::store::{BlobStore, MetadataStore};

pub struct IngestOrchestrator {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    upload_concurrency: usize,
    default_color: String,
}

enum UploadOutcome {
    Staged(WardrobeItem),
    Failed(WardrobeError),
    /// Not attempted because an earlier upload already failed
    Skipped,
}

impl IngestOrchestrator {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata,
            blobs,
            upload_concurrency: 1,
            default_color: UNKNOWN_COLOR.to_string(),
        }
    }

    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency.max(1);
        self
    }

    pub fn with_default_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self
    }

    /// Store user-confirmed candidates
    pub async fn commit(
        &self,
        owner_id: &str,
        candidates: Vec<CommitCandidate>,
    ) -> WardrobeResult<Vec<WardrobeItem>> {
        self.commit_with_source(owner_id, candidates, SourceTag::SegmentedConfirm)
            .await
    }

    pub async fn commit_with_source(
        &self,
        owner_id: &str,
        candidates: Vec<CommitCandidate>,
        source_tag: SourceTag,
    ) -> WardrobeResult<Vec<WardrobeItem>> {
        if owner_id.trim().is_empty() {
            return Err(WardrobeError::InvalidInput("Missing owner".to_string()));
        }
        if candidates.is_empty() {
            return Err(WardrobeError::InvalidInput("Missing items".to_string()));
        }
        if let Some(index) = candidates.iter().position(|c| c.image_bytes.is_empty()) {
            return Err(WardrobeError::InvalidInput(format!(
                "Item {} has no image",
                index
            )));
        }

        let count = candidates.len();
        let created_at = storage_timestamp();
        let aborted = AtomicBool::new(false);
        let aborted = &aborted;

        // `buffered` yields in input order, so staged items keep candidate order
        let mut uploads = stream::iter(candidates.into_iter().enumerate())
            .map(move |(index, candidate)| {
                self.upload_one(owner_id, index, candidate, created_at, source_tag, aborted)
            })
            .buffered(self.upload_concurrency);

        let mut staged = Vec::with_capacity(count);
        let mut failure = None;
        // Drain everything so in-flight uploads settle before deciding
        while let Some(outcome) = uploads.next().await {
            match outcome {
                UploadOutcome::Staged(item) => staged.push(item),
                UploadOutcome::Failed(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
                UploadOutcome::Skipped => {}
            }
        }

        if let Some(err) = failure {
            log_orphans(owner_id, &staged, "upload failure");
            return Err(err);
        }

        if let Err(e) = self.metadata.insert_items(&staged).await {
            log_orphans(owner_id, &staged, "metadata batch failure");
            return Err(WardrobeError::storage(e));
        }

        log::info!(
            "Committed {} wardrobe item(s) for {} ({})",
            staged.len(),
            owner_id,
            source_tag
        );
        Ok(staged)
    }

    async fn upload_one(
        &self,
        owner_id: &str,
        index: usize,
        candidate: CommitCandidate,
        created_at: DateTime<Utc>,
        source_tag: SourceTag,
        aborted: &AtomicBool,
    ) -> UploadOutcome {
        if aborted.load(Ordering::SeqCst) {
            return UploadOutcome::Skipped;
        }

        let raw_label = candidate.raw_label();
        let category = category::classify(&raw_label).unwrap_or_else(|| {
            log::debug!(
                "Label {:?} not recognized, stored as {}",
                raw_label,
                category::DEFAULT_CATEGORY
            );
            category::DEFAULT_CATEGORY
        });

        let item_id = generate_id();
        let path = BlobPath::new(owner_id, category, created_at, index, &item_id).to_string();

        match self.blobs.put(&path, candidate.image_bytes).await {
            Ok(blob_ref) => UploadOutcome::Staged(WardrobeItem {
                id: item_id,
                owner_id: owner_id.to_string(),
                category,
                raw_label,
                color_label: candidate
                    .color
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| self.default_color.clone()),
                blob_ref,
                created_at,
                source_tag,
            }),
            Err(e) => {
                aborted.store(true, Ordering::SeqCst);
                log::error!("Upload of item {} ({}) failed for {}: {:#}", index, path, owner_id, e);
                UploadOutcome::Failed(WardrobeError::StorageFailure(format!(
                    "Failed to upload item {} ({}): {:#}",
                    index, raw_label, e
                )))
            }
        }
    }
}

/// Current time at the precision of a Postgres `TIMESTAMPTZ` (microseconds)
fn storage_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(chrono::Duration::microseconds(1))
        .unwrap_or(now)
}

fn log_orphans(owner_id: &str, staged: &[WardrobeItem], reason: &str) {
    if staged.is_empty() {
        return;
    }
    let blob_ids: Vec<&str> = staged.iter().map(|i| i.blob_ref.blob_id.as_str()).collect();
    log::warn!(
        "Commit for {} aborted by {}; {} orphaned blob(s): {}",
        owner_id,
        reason,
        blob_ids.len(),
        blob_ids.join(", ")
    );
}
