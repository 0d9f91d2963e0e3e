use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Id, UNKNOWN_LABEL};

/// Root folder of every wardrobe blob
pub const BLOB_ROOT: &str = "wardrobe";

/// Closed garment taxonomy every stored item is tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxonomyCategory {
    Top,
    Bottom,
    Skirt,
    Dress,
    Shoes,
}

impl TaxonomyCategory {
    pub const ALL: [TaxonomyCategory; 5] = [
        TaxonomyCategory::Top,
        TaxonomyCategory::Bottom,
        TaxonomyCategory::Skirt,
        TaxonomyCategory::Dress,
        TaxonomyCategory::Shoes,
    ];

    /// Lowercase form used in blob paths
    pub fn slug(&self) -> &'static str {
        match self {
            TaxonomyCategory::Top => "top",
            TaxonomyCategory::Bottom => "bottom",
            TaxonomyCategory::Skirt => "skirt",
            TaxonomyCategory::Dress => "dress",
            TaxonomyCategory::Shoes => "shoes",
        }
    }
}

impl std::fmt::Display for TaxonomyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TaxonomyCategory::Top => write!(f, "Top"),
            TaxonomyCategory::Bottom => write!(f, "Bottom"),
            TaxonomyCategory::Skirt => write!(f, "Skirt"),
            TaxonomyCategory::Dress => write!(f, "Dress"),
            TaxonomyCategory::Shoes => write!(f, "Shoes"),
        }
    }
}

impl std::str::FromStr for TaxonomyCategory {
    type Err = String;

    /// Parses the stored form only; free text goes through `category::normalize`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(TaxonomyCategory::Top),
            "bottom" => Ok(TaxonomyCategory::Bottom),
            "skirt" => Ok(TaxonomyCategory::Skirt),
            "dress" => Ok(TaxonomyCategory::Dress),
            "shoes" => Ok(TaxonomyCategory::Shoes),
            _ => Err(format!("Unknown taxonomy category: {}", s)),
        }
    }
}

/// Which ingestion path produced an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    /// Candidates confirmed by the user after a separate segmentation call
    SegmentedConfirm,
    /// Every candidate of a segmentation call committed in one request
    SegmentedUpload,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SourceTag::SegmentedConfirm => write!(f, "segmented-confirm"),
            SourceTag::SegmentedUpload => write!(f, "segmented-upload"),
        }
    }
}

impl std::str::FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "segmented-confirm" => Ok(SourceTag::SegmentedConfirm),
            "segmented-upload" => Ok(SourceTag::SegmentedUpload),
            _ => Err(format!("Unknown source tag: {}", s)),
        }
    }
}

/// Reference to an image held by the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub url: String,
    /// Provider-assigned id, used for deletion
    pub blob_id: String,
}

/// A catalogued garment, as held by the metadata store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub id: Id,
    pub owner_id: Id,
    pub category: TaxonomyCategory,
    pub raw_label: String,
    pub color_label: String,
    pub blob_ref: BlobRef,
    pub created_at: DateTime<Utc>,
    pub source_tag: SourceTag,
}

/// Labeled cut-out returned by the segmentation service. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCandidate {
    pub label: String,
    /// PNG bytes with alpha channel
    pub image_bytes: Vec<u8>,
}

/// A candidate the caller confirmed for storage
#[derive(Debug, Clone, PartialEq)]
pub struct CommitCandidate {
    pub label: String,
    pub image_bytes: Vec<u8>,
    pub color: Option<String>,
}

impl CommitCandidate {
    pub fn new(label: impl Into<String>, image_bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            image_bytes,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Label as it should be retained on the stored item
    pub fn raw_label(&self) -> String {
        let trimmed = self.label.trim();
        if trimmed.is_empty() {
            UNKNOWN_LABEL.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl From<SegmentedCandidate> for CommitCandidate {
    fn from(candidate: SegmentedCandidate) -> Self {
        Self::new(candidate.label, candidate.image_bytes)
    }
}

/// Structured blob location: `wardrobe/{owner}/{category}/{millis}-{index}-{item_id}.png`
///
/// The item id is embedded in the file name so that a sweep can tell which
/// blobs have lost their metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
    pub owner_id: Id,
    pub category: TaxonomyCategory,
    pub created_millis: i64,
    pub index: usize,
    pub item_id: Id,
}

impl BlobPath {
    pub fn new(
        owner_id: &str,
        category: TaxonomyCategory,
        created_at: DateTime<Utc>,
        index: usize,
        item_id: &str,
    ) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            category,
            created_millis: created_at.timestamp_millis(),
            index,
            item_id: item_id.to_string(),
        }
    }

    /// Prefix under which all of an owner's blobs live
    pub fn owner_prefix(owner_id: &str) -> String {
        format!("{}/{}/", BLOB_ROOT, owner_id)
    }

    /// Recover the structured form from a stored path; `None` for foreign keys
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(BLOB_ROOT)?.strip_prefix('/')?;
        let mut segments = rest.split('/');
        let owner_id = segments.next()?;
        let category = segments.next()?.parse().ok()?;
        let file_name = segments.next()?;
        if segments.next().is_some() || owner_id.is_empty() {
            return None;
        }

        let stem = file_name.strip_suffix(".png")?;
        let mut parts = stem.splitn(3, '-');
        let created_millis = parts.next()?.parse().ok()?;
        let index = parts.next()?.parse().ok()?;
        let item_id = parts.next()?;
        if item_id.is_empty() {
            return None;
        }

        Some(Self {
            owner_id: owner_id.to_string(),
            category,
            created_millis,
            index,
            item_id: item_id.to_string(),
        })
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}-{:03}-{}.png",
            BLOB_ROOT,
            self.owner_id,
            self.category.slug(),
            self.created_millis,
            self.index,
            self.item_id
        )
    }
}
