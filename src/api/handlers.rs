use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, Query, State,
    },
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{WardrobeError, WardrobeResult};
use crate::logic::segmentation::{decode_image, encode_image};
use crate::logic::ImageFile;
use crate::model::{CommitCandidate, Id, Principal, SegmentedCandidate, SourceTag, WardrobeItem};
use crate::service::AppState;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Candidate as shown to the caller for selection
#[derive(Debug, Serialize)]
pub struct CandidateView {
    #[serde(rename = "type")]
    pub label: String,
    pub image_png_base64: String,
    pub image_data_url: String,
}

impl From<&SegmentedCandidate> for CandidateView {
    fn from(candidate: &SegmentedCandidate) -> Self {
        let encoded = encode_image(&candidate.image_bytes);
        Self {
            label: candidate.label.clone(),
            image_data_url: format!("data:image/png;base64,{}", encoded),
            image_png_base64: encoded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub ok: bool,
    pub items: Vec<CandidateView>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub ok: bool,
    pub items: Vec<WardrobeItem>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemsResponse {
    fn new(items: Vec<WardrobeItem>) -> Self {
        Self {
            ok: true,
            count: items.len(),
            items,
            message: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub ok: bool,
    pub item: WardrobeItem,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct OrphansResponse {
    pub ok: bool,
    pub orphans: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub items: Vec<ConfirmItem>,
}

/// One selected candidate, echoed back from the parse response
#[derive(Debug, Deserialize)]
pub struct ConfirmItem {
    #[serde(rename = "type", alias = "label", default)]
    pub label: String,
    #[serde(default)]
    pub image_png_base64: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub blob_id: Option<String>,
}

fn invalid_multipart(e: MultipartError) -> WardrobeError {
    WardrobeError::InvalidInput(e.body_text())
}

/// Pull the `file` field out of a multipart body
async fn read_image(multipart: Result<Multipart, MultipartRejection>) -> WardrobeResult<ImageFile> {
    let mut multipart = multipart.map_err(|e| WardrobeError::InvalidInput(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(invalid_multipart)?;

        return Ok(ImageFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(WardrobeError::InvalidInput("Missing file".to_string()))
}

fn into_commit_candidates(items: Vec<ConfirmItem>) -> WardrobeResult<Vec<CommitCandidate>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let bytes = decode_image(&item.image_png_base64)
                .map_err(|e| WardrobeError::InvalidInput(format!("Item {}: {}", index, e)))?;
            let candidate = CommitCandidate::new(item.label, bytes);
            Ok(match item.color.filter(|c| !c.trim().is_empty()) {
                Some(color) => candidate.with_color(color),
                None => candidate,
            })
        })
        .collect()
}

/// `POST /wardrobe/parse`: segment a photo without storing anything
pub async fn parse_photo(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Result<Multipart, MultipartRejection>,
) -> WardrobeResult<Json<ParseResponse>> {
    // The caller is verified by the extractor before the body is read
    let image = read_image(multipart).await?;
    let candidates = state.segmentation.segment_for(&principal, &image).await?;

    let items: Vec<CandidateView> = candidates.iter().map(CandidateView::from).collect();
    Ok(Json(ParseResponse {
        ok: true,
        count: items.len(),
        items,
    }))
}

/// `POST /wardrobe/confirm`: store the candidates the caller selected
pub async fn confirm_items(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> WardrobeResult<Json<ItemsResponse>> {
    let Json(request) = payload.map_err(|e| WardrobeError::InvalidInput(e.body_text()))?;
    let candidates = into_commit_candidates(request.items)?;

    let items = state.ingest.commit(&principal.user_id, candidates).await?;
    Ok(Json(ItemsResponse::new(items)))
}

/// `POST /wardrobe/upload`: segment a photo and store every candidate
pub async fn upload_photo(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Result<Multipart, MultipartRejection>,
) -> WardrobeResult<Json<ItemsResponse>> {
    let image = read_image(multipart).await?;
    let candidates = state.segmentation.segment_for(&principal, &image).await?;

    if candidates.is_empty() {
        return Ok(Json(ItemsResponse {
            message: Some("No items detected".to_string()),
            ..ItemsResponse::new(Vec::new())
        }));
    }

    let items = state
        .ingest
        .commit_with_source(
            &principal.user_id,
            candidates.into_iter().map(CommitCandidate::from).collect(),
            SourceTag::SegmentedUpload,
        )
        .await?;
    Ok(Json(ItemsResponse::new(items)))
}

pub async fn list_items(
    State(state): State<AppState>,
    principal: Principal,
) -> WardrobeResult<Json<ItemsResponse>> {
    let items = state.query.list(&principal.user_id).await?;
    Ok(Json(ItemsResponse::new(items)))
}

pub async fn get_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(item_id): Path<Id>,
) -> WardrobeResult<Json<ItemResponse>> {
    let item = state.query.get(&principal.user_id, &item_id).await?;
    Ok(Json(ItemResponse { ok: true, item }))
}

pub async fn delete_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(item_id): Path<Id>,
    Query(query): Query<DeleteQuery>,
) -> WardrobeResult<Json<DeleteResponse>> {
    state
        .removal
        .remove(&principal.user_id, &item_id, query.blob_id.as_deref())
        .await?;
    Ok(Json(DeleteResponse { ok: true }))
}

pub async fn list_orphans(
    State(state): State<AppState>,
    principal: Principal,
) -> WardrobeResult<Json<OrphansResponse>> {
    let orphans = state.orphans.find_orphans(&principal.user_id).await?;
    Ok(Json(OrphansResponse {
        ok: true,
        count: orphans.len(),
        orphans,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_item_accepts_type_or_label() {
        let request: ConfirmRequest = serde_json::from_str(
            r#"{"items":[
                {"type":"pants","image_png_base64":"cG5n"},
                {"label":"Váy","image_png_base64":"data:image/png;base64,cG5n","color":"Đỏ"}
            ]}"#,
        )
        .unwrap();

        let candidates = into_commit_candidates(request.items).unwrap();
        assert_eq!(candidates[0].label, "pants");
        assert_eq!(candidates[0].image_bytes, b"png");
        assert_eq!(candidates[0].color, None);
        assert_eq!(candidates[1].label, "Váy");
        assert_eq!(candidates[1].color.as_deref(), Some("Đỏ"));
    }

    #[test]
    fn test_undecodable_image_names_the_item() {
        let items = vec![
            ConfirmItem {
                label: "shirt".to_string(),
                image_png_base64: "cG5n".to_string(),
                color: None,
            },
            ConfirmItem {
                label: "shoes".to_string(),
                image_png_base64: "%%%".to_string(),
                color: None,
            },
        ];

        let err = into_commit_candidates(items).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("Item 1"));
    }

    #[test]
    fn test_candidate_view_carries_data_url() {
        let view = CandidateView::from(&SegmentedCandidate {
            label: "skirt".to_string(),
            image_bytes: b"png".to_vec(),
        });
        assert_eq!(view.image_png_base64, "cG5n");
        assert_eq!(view.image_data_url, "data:image/png;base64,cG5n");
    }
}
