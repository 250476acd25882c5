use std::sync::Arc;
use tracing::{error, info};

use crate::{
    utils::error::{Result, FaceError},
    core::{
        crypto::cipher::TemplateCipher,
        identity::{
            matcher::{MatchOutcome, Matcher},
            template::TemplateBuilder,
            types::{FaceDescriptor, StoredTemplate},
        },
    },
    storage::TemplateStore,
};

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub face_id: String,
    pub distance: f64,
    /// Records that could not be decrypted and were left out of the scan.
    pub skipped: usize,
}

/// Extractor → store scan → decrypt each → first-match matcher.
pub struct VerificationService {
    builder: Arc<TemplateBuilder>,
    cipher: Arc<TemplateCipher>,
    store: Arc<dyn TemplateStore>,
    matcher: Matcher,
}

impl VerificationService {
    pub fn new(
        builder: Arc<TemplateBuilder>,
        cipher: Arc<TemplateCipher>,
        store: Arc<dyn TemplateStore>,
        matcher: Matcher,
    ) -> Self {
        Self {
            builder,
            cipher,
            store,
            matcher,
        }
    }

    pub async fn verify(&self, image: &[u8]) -> Result<VerificationOutcome> {
        let probe = self.builder.probe_descriptor(image).await?;

        let records = self.store.list_all().await?;
        if records.is_empty() {
            return Err(FaceError::NoFacesEnrolled);
        }

        // Templates are decrypted lazily, one at a time, and dropped after
        // their comparison. A record that fails to open is skipped.
        let mut skipped = 0usize;
        let candidates = records.iter().filter_map(|record| match self.open(record) {
            Ok(descriptor) => Some((record.face_id.clone(), descriptor)),
            Err(e) => {
                error!(face_id = %record.face_id, "Skipping stored template: {}", e);
                skipped += 1;
                None
            }
        });

        match self.matcher.find_first(&probe, candidates) {
            MatchOutcome::Matched { face_id, distance } => {
                info!(face_id = %face_id, distance, skipped, "Face verified");
                Ok(VerificationOutcome {
                    face_id,
                    distance,
                    skipped,
                })
            }
            MatchOutcome::NoMatch { compared } => {
                info!(compared, skipped, "No matching face");
                Err(FaceError::NoMatch)
            }
            // Only when nothing at all could be opened; otherwise it is a plain miss
            MatchOutcome::NoCandidates if skipped == records.len() => Err(FaceError::Decryption(format!(
                "none of the {} stored templates could be decrypted",
                records.len()
            ))),
            MatchOutcome::NoCandidates => Err(FaceError::NoMatch),
        }
    }

    fn open(&self, record: &StoredTemplate) -> Result<FaceDescriptor> {
        let plain = self.cipher.decrypt(&record.template)?;
        FaceDescriptor::from_bytes(&plain)
    }
}
