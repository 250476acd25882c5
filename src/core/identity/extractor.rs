// src/core/identity/extractor.rs
use async_trait::async_trait;
use thiserror::Error;

use super::types::FaceDescriptor;

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The image itself is unusable: corrupt, truncated or an unsupported format.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The detector could not be reached or failed internally.
    #[error("descriptor service unavailable: {0}")]
    Unavailable(String),
}

/// Face detection and descriptor extraction.
///
/// Returns one descriptor per detected face, in detector order. An empty
/// vector means the image was readable but contained no face. Every
/// descriptor produced by one implementation must have the same length.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DescriptorExtractor: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<Vec<FaceDescriptor>, ExtractionError>;
}
