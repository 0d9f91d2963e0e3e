pub mod category;
pub mod ingest;
pub mod orphans;
pub mod query;
pub mod removal;
pub mod segmentation;

pub use category::{classify, normalize};
pub use ingest::IngestOrchestrator;
pub use orphans::OrphanScanner;
pub use query::WardrobeQuery;
pub use removal::DeletionCompensator;
pub use segmentation::{ImageFile, SegmentationProxy, SegmentationService};
