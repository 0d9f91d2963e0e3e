use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::logic::{
    DeletionCompensator, IngestOrchestrator, OrphanScanner, SegmentationProxy,
    SegmentationService, WardrobeQuery,
};
use crate::store::{BlobStore, MetadataStore};

/// Every pipeline component, wired once at startup against the same collaborators
pub struct WardrobeServices {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub segmentation: SegmentationProxy,
    pub ingest: IngestOrchestrator,
    pub removal: DeletionCompensator,
    pub query: WardrobeQuery,
    pub orphans: OrphanScanner,
}

pub type AppState = Arc<WardrobeServices>;

impl WardrobeServices {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        verifier: Arc<dyn IdentityVerifier>,
        segmentation_service: Arc<dyn SegmentationService>,
        config: &AppConfig,
    ) -> Self {
        Self {
            segmentation: SegmentationProxy::new(
                verifier.clone(),
                segmentation_service,
                config.segmentation.max_upload_bytes,
            ),
            ingest: IngestOrchestrator::new(metadata.clone(), blobs.clone())
                .with_upload_concurrency(config.ingest.upload_concurrency)
                .with_default_color(config.ingest.default_color.clone()),
            removal: DeletionCompensator::new(metadata.clone(), blobs.clone()),
            query: WardrobeQuery::new(metadata.clone()),
            orphans: OrphanScanner::new(metadata, blobs),
            verifier,
        }
    }

    pub fn into_state(self) -> AppState {
        Arc::new(self)
    }
}
