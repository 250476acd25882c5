// src/utils/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    /// The image at `index` was readable but contained no face.
    #[error("No face found in image {index}")]
    NoFaceDetected { index: usize },

    #[error("Error processing image {index}: {cause}")]
    ImageProcessing { index: usize, cause: String },

    #[error("Face with faceId {0} already exists")]
    DuplicateIdentifier(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("No faces enrolled in the database")]
    NoFacesEnrolled,

    #[error("No matching face found")]
    NoMatch,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Extractor error: {0}")]
    Extractor(String),
}

impl FaceError {
    /// Errors caused by the deployment rather than the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            FaceError::Config(_)
                | FaceError::Crypto(_)
                | FaceError::Storage(_)
                | FaceError::Extractor(_)
                | FaceError::Decryption(_)
        )
    }
}

impl From<std::io::Error> for FaceError {
    fn from(error: std::io::Error) -> Self {
        FaceError::Storage(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FaceError>;
