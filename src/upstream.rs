use reqwest::multipart::{Form, Part};
use std::time::Duration;

use crate::config::SegmentationConfig;
use crate::error::{WardrobeError, WardrobeResult};
use crate::logic::segmentation::{decode_parse_response, ImageFile, SegmentationService};
use crate::model::SegmentedCandidate;

const USER_AGENT: &str = concat!("wardrobe-ingest/", env!("CARGO_PKG_VERSION"));

/// Upstream error bodies are truncated to this many characters
const ERROR_DETAIL_LIMIT: usize = 600;

/// Client for the segmentation service's `POST /parse` endpoint
pub struct HttpSegmentationClient {
    http_client: reqwest::Client,
    parse_url: String,
}

impl HttpSegmentationClient {
    pub fn new(config: &SegmentationConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            parse_url: format!("{}/parse", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait::async_trait]
impl SegmentationService for HttpSegmentationClient {
    async fn parse(&self, image: &ImageFile) -> WardrobeResult<Vec<SegmentedCandidate>> {
        let mut part = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
        if let Some(content_type) = &image.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                WardrobeError::InvalidInput(format!("Invalid content type: {}", e))
            })?;
        }
        let form = Form::new().part("file", part);

        log::debug!("Forwarding {} to {}", image.file_name, self.parse_url);

        let response = self
            .http_client
            .post(&self.parse_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WardrobeError::UpstreamUnavailable("request timed out".to_string())
                } else {
                    WardrobeError::UpstreamUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_DETAIL_LIMIT)
                .collect();
            return Err(WardrobeError::UpstreamUnavailable(format!(
                "status {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                WardrobeError::UpstreamUnavailable("response timed out".to_string())
            } else {
                WardrobeError::UpstreamInvalidResponse(format!("unreadable body: {}", e))
            }
        })?;

        decode_parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::segmentation::encode_image;
    use axum::{extract::Multipart, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    /// Serve `app` on an ephemeral port and return its base url
    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str, timeout_secs: u64) -> HttpSegmentationClient {
        HttpSegmentationClient::new(&SegmentationConfig {
            base_url: base_url.to_string(),
            timeout_secs,
            max_upload_bytes: 1024,
        })
        .unwrap()
    }

    fn photo() -> ImageFile {
        ImageFile {
            file_name: "outfit.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: b"jpeg-bytes".to_vec(),
        }
    }

    async fn echo_parse(mut multipart: Multipart) -> Json<Value> {
        let mut received = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            if field.name() == Some("file") {
                received = field.bytes().await.unwrap().to_vec();
            }
        }
        Json(json!({
            "ok": true,
            "items": [
                { "type": "pants", "image_png_base64": encode_image(&received) }
            ]
        }))
    }

    #[tokio::test]
    async fn test_forwards_file_and_decodes_candidates() {
        let base = spawn(Router::new().route("/parse", post(echo_parse))).await;

        let candidates = client(&base, 5).parse(&photo()).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "pants");
        assert_eq!(candidates[0].image_bytes, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let app = Router::new().route(
            "/parse",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let base = spawn(app).await;

        let err = client(&base, 5).parse(&photo()).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(err.to_string().contains("model crashed"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let app = Router::new().route("/parse", post(|| async { "not json" }));
        let base = spawn(app).await;

        let err = client(&base, 5).parse(&photo()).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_invalid_response");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr), 5)
            .parse(&photo())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let app = Router::new().route(
            "/parse",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = spawn(app).await;

        let err = client(&base, 1).parse(&photo()).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
    }
}
