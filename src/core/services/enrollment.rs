use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    utils::error::{Result, FaceError},
    core::{
        crypto::cipher::TemplateCipher,
        identity::{template::TemplateBuilder, types::StoredTemplate},
    },
    storage::TemplateStore,
};

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentOutcome {
    pub face_id: String,
    pub name: Option<String>,
    pub images: usize,
}

/// Extractor → template builder → cipher → store.
pub struct EnrollmentService {
    builder: Arc<TemplateBuilder>,
    cipher: Arc<TemplateCipher>,
    store: Arc<dyn TemplateStore>,
}

impl EnrollmentService {
    pub fn new(
        builder: Arc<TemplateBuilder>,
        cipher: Arc<TemplateCipher>,
        store: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            builder,
            cipher,
            store,
        }
    }

    pub async fn enroll<I: AsRef<[u8]> + Sync>(
        &self,
        face_id: &str,
        name: Option<String>,
        images: &[I],
    ) -> Result<EnrollmentOutcome> {
        let face_id = face_id.trim();
        if face_id.is_empty() {
            return Err(FaceError::Validation("faceId is required".into()));
        }
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        self.builder.policy().check(images.len())?;

        // Cheap early rejection; insert below is still the authority.
        if self.store.contains(face_id).await? {
            warn!(face_id, "Enrollment rejected, faceId already exists");
            return Err(FaceError::DuplicateIdentifier(face_id.to_string()));
        }

        let template = self.builder.build_template(images).await?;
        let encrypted = self.cipher.encrypt(&template.to_bytes())?;
        drop(template);

        self.store
            .insert(StoredTemplate::new(face_id, name.clone(), encrypted))
            .await?;

        info!(face_id, images = images.len(), "Enrolled face");
        Ok(EnrollmentOutcome {
            face_id: face_id.to_string(),
            name,
            images: images.len(),
        })
    }
}
