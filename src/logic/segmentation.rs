use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::error::{WardrobeError, WardrobeResult};
use crate::model::{strip_data_uri, Principal, SegmentedCandidate};

/// Photo submitted for segmentation
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// External service that cuts a photo into labeled garment images
#[async_trait::async_trait]
pub trait SegmentationService: Send + Sync {
    async fn parse(&self, image: &ImageFile) -> WardrobeResult<Vec<SegmentedCandidate>>;
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    ok: Option<bool>,
    items: Option<Vec<ParsedItem>>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParsedItem {
    #[serde(rename = "type", default)]
    label: Option<String>,
    image_png_base64: Option<String>,
}

/// Decode a `/parse` response body into candidates.
///
/// Anything but `{"ok": true, "items": [...]}` with decodable images is an
/// `UpstreamInvalidResponse`. An empty `items` list is a valid result.
pub fn decode_parse_response(body: &[u8]) -> WardrobeResult<Vec<SegmentedCandidate>> {
    let response: ParseResponse = serde_json::from_slice(body).map_err(|e| {
        WardrobeError::UpstreamInvalidResponse(format!("body is not a parse result: {}", e))
    })?;

    if response.ok != Some(true) {
        return Err(WardrobeError::UpstreamInvalidResponse(
            response
                .message
                .unwrap_or_else(|| "service reported failure".to_string()),
        ));
    }

    let items = response.items.ok_or_else(|| {
        WardrobeError::UpstreamInvalidResponse("missing items list".to_string())
    })?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let encoded = item.image_png_base64.ok_or_else(|| {
                WardrobeError::UpstreamInvalidResponse(format!("item {} has no image", index))
            })?;
            let image_bytes = decode_image(&encoded).map_err(|e| {
                WardrobeError::UpstreamInvalidResponse(format!("item {}: {}", index, e))
            })?;
            Ok(SegmentedCandidate {
                label: item.label.unwrap_or_default(),
                image_bytes,
            })
        })
        .collect()
}

/// Decode a base64 image, with or without a `data:` URI header
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, String> {
    let bytes = STANDARD
        .decode(strip_data_uri(encoded))
        .map_err(|e| format!("invalid base64 image: {}", e))?;
    if bytes.is_empty() {
        return Err("image is empty".to_string());
    }
    Ok(bytes)
}

pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Authenticates the caller, validates the photo and forwards it upstream.
/// Holds no state between calls.
pub struct SegmentationProxy {
    verifier: Arc<dyn IdentityVerifier>,
    service: Arc<dyn SegmentationService>,
    max_upload_bytes: usize,
}

impl SegmentationProxy {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        service: Arc<dyn SegmentationService>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            verifier,
            service,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn segment(
        &self,
        owner_token: &str,
        image: &ImageFile,
    ) -> WardrobeResult<Vec<SegmentedCandidate>> {
        let principal = self.verifier.verify(owner_token).await?;
        self.segment_for(&principal, image).await
    }

    /// Segment on behalf of an already resolved principal
    pub async fn segment_for(
        &self,
        principal: &Principal,
        image: &ImageFile,
    ) -> WardrobeResult<Vec<SegmentedCandidate>> {
        self.validate(image)?;

        let candidates = self.service.parse(image).await.map_err(|e| {
            log::error!("Segmentation failed for {}: {}", principal.user_id, e);
            e
        })?;

        log::info!(
            "Segmented {} ({} bytes) for {}: {} candidate(s)",
            image.file_name,
            image.bytes.len(),
            principal.user_id,
            candidates.len()
        );
        Ok(candidates)
    }

    fn validate(&self, image: &ImageFile) -> WardrobeResult<()> {
        if image.bytes.is_empty() {
            return Err(WardrobeError::InvalidInput("Missing file".to_string()));
        }
        let is_image = image
            .content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(WardrobeError::InvalidInput(
                "Only image files are allowed".to_string(),
            ));
        }
        if image.bytes.len() > self.max_upload_bytes {
            return Err(WardrobeError::InvalidInput(format!(
                "File too large (max {} bytes)",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenVerifier;
    use parking_lot::Mutex;
    use serde_json::json;

    struct FakeService {
        result: Mutex<Option<WardrobeResult<Vec<SegmentedCandidate>>>>,
        calls: Mutex<usize>,
    }

    impl FakeService {
        fn returning(result: WardrobeResult<Vec<SegmentedCandidate>>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl SegmentationService for FakeService {
        async fn parse(&self, _image: &ImageFile) -> WardrobeResult<Vec<SegmentedCandidate>> {
            *self.calls.lock() += 1;
            self.result.lock().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn verifier() -> Arc<dyn IdentityVerifier> {
        Arc::new(StaticTokenVerifier::new([("token-u1".to_string(), "U1".to_string())]))
    }

    fn photo(bytes: usize) -> ImageFile {
        ImageFile {
            file_name: "outfit.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![7; bytes],
        }
    }

    fn candidate(label: &str) -> SegmentedCandidate {
        SegmentedCandidate {
            label: label.to_string(),
            image_bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_decode_valid_response() {
        let body = json!({
            "ok": true,
            "items": [
                { "type": "pants", "image_png_base64": encode_image(b"png-1") },
                { "type": "shoes", "image_png_base64": format!("data:image/png;base64,{}", encode_image(b"png-2")) }
            ]
        });
        let candidates = decode_parse_response(body.to_string().as_bytes()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].label, "pants");
        assert_eq!(candidates[0].image_bytes, b"png-1");
        assert_eq!(candidates[1].image_bytes, b"png-2");
    }

    #[test]
    fn test_decode_empty_list_is_not_an_error() {
        let body = json!({ "ok": true, "items": [] });
        assert!(decode_parse_response(body.to_string().as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_decode_malformed_responses() {
        let bodies = vec![
            String::new(),
            "<html>oops</html>".to_string(),
            json!({ "ok": false, "message": "model not loaded", "items": [] }).to_string(),
            json!({ "ok": true }).to_string(),
            json!({ "items": [] }).to_string(),
            json!({ "ok": true, "items": [{ "type": "top", "image_png_base64": "!!!" }] }).to_string(),
            json!({ "ok": true, "items": [{ "type": "top" }] }).to_string(),
            json!({ "ok": true, "items": [{ "type": "top", "image_png_base64": "" }] }).to_string(),
        ];
        for body in bodies {
            let err = decode_parse_response(body.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), "upstream_invalid_response", "body {body:?}");
        }
    }

    #[tokio::test]
    async fn test_segment_rejects_unknown_token() {
        let service = FakeService::returning(Ok(vec![candidate("top")]));
        let proxy = SegmentationProxy::new(verifier(), service.clone(), 1024);

        let err = proxy.segment("nope", &photo(10)).await.unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
        assert_eq!(*service.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_segment_validates_input_before_calling_upstream() {
        let service = FakeService::returning(Ok(vec![candidate("top")]));
        let proxy = SegmentationProxy::new(verifier(), service.clone(), 1024);

        let oversized = photo(1025);
        let mut not_an_image = photo(10);
        not_an_image.content_type = Some("application/pdf".to_string());
        let mut untyped = photo(10);
        untyped.content_type = None;

        for image in [photo(0), oversized, not_an_image, untyped] {
            let err = proxy.segment("token-u1", &image).await.unwrap_err();
            assert_eq!(err.kind(), "invalid_input");
        }
        assert_eq!(*service.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_segment_returns_candidates() {
        let service = FakeService::returning(Ok(vec![candidate("top"), candidate("pants")]));
        let proxy = SegmentationProxy::new(verifier(), service.clone(), 1024);

        let candidates = proxy.segment("token-u1", &photo(1024)).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(*service.calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_segment_passes_upstream_errors_through() {
        let service = FakeService::returning(Err(WardrobeError::UpstreamUnavailable(
            "connection refused".to_string(),
        )));
        let proxy = SegmentationProxy::new(verifier(), service, 1024);

        let err = proxy.segment("token-u1", &photo(10)).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
    }
}
