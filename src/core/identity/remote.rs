// src/core/identity/remote.rs
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    extractor::{DescriptorExtractor, ExtractionError},
    types::FaceDescriptor,
};
use crate::utils::{
    config::ExtractorConfig,
    error::{FaceError, Result},
};

#[derive(Debug, Deserialize)]
struct DescriptorResponse {
    descriptors: Vec<Vec<f64>>,
}

/// Extractor backed by an external descriptor service.
///
/// Images are decoded locally first so corrupt uploads are rejected without a
/// round trip; the original bytes are then posted to the service.
pub struct HttpExtractor {
    client: Client,
    endpoint: String,
}

impl HttpExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FaceError::Config(format!("Failed to build extractor client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Decodes the image and returns its dimensions.
pub fn inspect_image(bytes: &[u8]) -> std::result::Result<(u32, u32), ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::InvalidImage("empty image".into()));
    }

    let image = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::InvalidImage(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ExtractionError::InvalidImage("image has no pixels".into()));
    }

    Ok((image.width(), image.height()))
}

#[async_trait]
impl DescriptorExtractor for HttpExtractor {
    async fn extract(&self, image: &[u8]) -> std::result::Result<Vec<FaceDescriptor>, ExtractionError> {
        let owned = image.to_vec();
        let (width, height) = tokio::task::spawn_blocking(move || inspect_image(&owned))
            .await
            .map_err(|e| ExtractionError::Unavailable(format!("image decode task failed: {}", e)))??;
        debug!(width, height, "Decoded image, requesting descriptors");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let reason = response.text().await.unwrap_or_default();
            warn!(%status, "Descriptor service rejected image: {}", reason);
            return Err(ExtractionError::InvalidImage(if reason.is_empty() {
                status.to_string()
            } else {
                reason
            }));
        }
        if status != StatusCode::OK {
            return Err(ExtractionError::Unavailable(format!(
                "descriptor service returned {}",
                status
            )));
        }

        let body: DescriptorResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Unavailable(format!("malformed descriptor response: {}", e)))?;

        Ok(body.descriptors.into_iter().map(FaceDescriptor::new).collect())
    }
}
