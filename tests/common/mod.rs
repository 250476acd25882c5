// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use facevault::{
    core::{
        crypto::cipher::TemplateCipher,
        identity::{
            extractor::{DescriptorExtractor, ExtractionError},
            matcher::Matcher,
            template::{ImagePolicy, TemplateBuilder},
            types::FaceDescriptor,
        },
        services::{enrollment::EnrollmentService, verification::VerificationService},
    },
    storage::{FileTemplateStore, TemplateStore},
};
use tempfile::TempDir;

pub const TEST_KEY: [u8; 32] = [7u8; 32];

/// Extractor that reads descriptors straight out of the "image" bytes.
///
/// - `face:0.1,0.2,0.3` yields one face with that descriptor
/// - `noface` yields no faces
/// - anything else is rejected as an unreadable image
pub struct FakeExtractor;

#[async_trait]
impl DescriptorExtractor for FakeExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<FaceDescriptor>, ExtractionError> {
        let text = std::str::from_utf8(image)
            .map_err(|_| ExtractionError::InvalidImage("not a test image".into()))?;

        if text == "noface" {
            return Ok(Vec::new());
        }

        let values = text
            .strip_prefix("face:")
            .ok_or_else(|| ExtractionError::InvalidImage(format!("unknown test image {}", text)))?
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ExtractionError::InvalidImage(e.to_string()))?;

        Ok(vec![FaceDescriptor::new(values)])
    }
}

pub fn face(values: &[f64]) -> Vec<u8> {
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("face:{}", values.join(",")).into_bytes()
}

pub struct TestContext {
    pub enrollment_service: Arc<EnrollmentService>,
    pub verification_service: Arc<VerificationService>,
    pub storage: Arc<dyn TemplateStore>,
    pub cipher: Arc<TemplateCipher>,
    // Held so the store directory outlives the test
    pub dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(ImagePolicy {
            min_images: 1,
            max_images: 5,
        })
    }

    pub fn with_policy(policy: ImagePolicy) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let storage: Arc<dyn TemplateStore> =
            Arc::new(FileTemplateStore::open(dir.path()).expect("Failed to open store"));
        let cipher = Arc::new(TemplateCipher::new(&TEST_KEY).expect("Failed to build cipher"));
        let builder = Arc::new(TemplateBuilder::new(Arc::new(FakeExtractor), policy));

        let enrollment_service = Arc::new(EnrollmentService::new(
            builder.clone(),
            cipher.clone(),
            storage.clone(),
        ));
        let verification_service = Arc::new(VerificationService::new(
            builder,
            cipher.clone(),
            storage.clone(),
            Matcher::default(),
        ));

        Self {
            enrollment_service,
            verification_service,
            storage,
            cipher,
            dir,
        }
    }
}
