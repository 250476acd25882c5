// src/core/identity/types.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

use crate::utils::error::{Result, FaceError};

const VALUE_WIDTH: usize = std::mem::size_of::<f64>();

/// Fixed-length numeric summary of one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceDescriptor(Vec<f64>);

impl FaceDescriptor {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance. Callers must check lengths first; extra values on
    /// the longer side are ignored.
    pub fn distance(&self, other: &FaceDescriptor) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Little-endian `f64` encoding used as the plaintext of a stored template.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * VALUE_WIDTH);
        for value in &self.0 {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % VALUE_WIDTH != 0 {
            return Err(FaceError::Decryption(format!(
                "template payload of {} bytes is not a descriptor",
                bytes.len()
            )));
        }

        let values = bytes
            .chunks_exact(VALUE_WIDTH)
            .map(|chunk| {
                let mut raw = [0u8; VALUE_WIDTH];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();

        Ok(Self(values))
    }
}

impl From<Vec<f64>> for FaceDescriptor {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// One persisted identity. The template is always ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTemplate {
    pub face_id: String,
    pub name: Option<String>,
    #[serde(with = "hex::serde")]
    pub template: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl StoredTemplate {
    pub fn new(face_id: impl Into<String>, name: Option<String>, template: Vec<u8>) -> Self {
        Self {
            face_id: face_id.into(),
            name,
            template,
            created_at: Utc::now(),
        }
    }
}
