// src/core/identity/template.rs
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::{
    extractor::{DescriptorExtractor, ExtractionError},
    types::FaceDescriptor,
};
use crate::utils::{
    config::EnrollmentConfig,
    error::{FaceError, Result},
};

/// Cause reported to callers when the extractor rejects an image.
pub const UNREADABLE_IMAGE: &str = "unreadable image";

/// How many images one enrollment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    pub min_images: usize,
    pub max_images: usize,
}

impl ImagePolicy {
    pub fn check(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(FaceError::Validation("At least one image is required".into()));
        }
        if count < self.min_images || count > self.max_images {
            let expected = if self.min_images == self.max_images {
                format!("exactly {}", self.min_images)
            } else {
                format!("between {} and {}", self.min_images, self.max_images)
            };
            return Err(FaceError::Validation(format!(
                "Expected {} images, got {}",
                expected, count
            )));
        }
        Ok(())
    }
}

impl From<&EnrollmentConfig> for ImagePolicy {
    fn from(config: &EnrollmentConfig) -> Self {
        Self {
            min_images: config.min_images.max(1),
            max_images: config.max_images,
        }
    }
}

pub struct TemplateBuilder {
    extractor: Arc<dyn DescriptorExtractor>,
    policy: ImagePolicy,
}

impl TemplateBuilder {
    pub fn new(extractor: Arc<dyn DescriptorExtractor>, policy: ImagePolicy) -> Self {
        Self { extractor, policy }
    }

    pub fn policy(&self) -> ImagePolicy {
        self.policy
    }

    /// Derives one canonical template from every image of an enrollment.
    ///
    /// All images are extracted concurrently; on failure the error of the
    /// lowest failing index is returned, so the outcome does not depend on
    /// completion order. Nothing is produced unless every image has a face.
    pub async fn build_template<I: AsRef<[u8]>>(&self, images: &[I]) -> Result<FaceDescriptor> {
        self.policy.check(images.len())?;

        let extractions = join_all(
            images
                .iter()
                .map(|image| self.extractor.extract(image.as_ref())),
        )
        .await;

        let mut descriptors = Vec::with_capacity(images.len());
        for (index, extraction) in extractions.into_iter().enumerate() {
            descriptors.push(first_face(index, extraction)?);
        }

        let template = mean_descriptor(&descriptors)?;
        debug!(
            images = images.len(),
            dimensions = template.len(),
            "Built template"
        );
        Ok(template)
    }

    /// Descriptor of the first face in a single probe image.
    pub async fn probe_descriptor(&self, image: &[u8]) -> Result<FaceDescriptor> {
        first_face(0, self.extractor.extract(image).await)
    }
}

fn first_face(
    index: usize,
    extraction: std::result::Result<Vec<FaceDescriptor>, ExtractionError>,
) -> Result<FaceDescriptor> {
    match extraction {
        Ok(faces) => {
            if faces.len() > 1 {
                debug!(index, faces = faces.len(), "Multiple faces detected, using the first");
            }
            let face = faces
                .into_iter()
                .next()
                .ok_or(FaceError::NoFaceDetected { index })?;
            if face.is_empty() {
                return Err(FaceError::ImageProcessing {
                    index,
                    cause: "extractor returned an empty descriptor".into(),
                });
            }
            Ok(face)
        }
        Err(ExtractionError::InvalidImage(reason)) => {
            // extractor detail stays in the log
            warn!(index, "Image rejected: {}", reason);
            Err(FaceError::ImageProcessing {
                index,
                cause: UNREADABLE_IMAGE.into(),
            })
        }
        Err(ExtractionError::Unavailable(cause)) => Err(FaceError::Extractor(cause)),
    }
}

/// Element-wise mean of equally sized descriptors.
pub fn mean_descriptor(descriptors: &[FaceDescriptor]) -> Result<FaceDescriptor> {
    let first = descriptors
        .first()
        .ok_or_else(|| FaceError::Validation("At least one image is required".into()))?;
    let dimensions = first.len();

    let mut sums = vec![0.0f64; dimensions];
    for (index, descriptor) in descriptors.iter().enumerate() {
        if descriptor.len() != dimensions {
            return Err(FaceError::ImageProcessing {
                index,
                cause: format!(
                    "descriptor length mismatch: expected {} values, found {}",
                    dimensions,
                    descriptor.len()
                ),
            });
        }
        for (sum, value) in sums.iter_mut().zip(descriptor.values()) {
            *sum += value;
        }
    }

    let count = descriptors.len() as f64;
    Ok(FaceDescriptor::new(sums.into_iter().map(|sum| sum / count).collect()))
}
