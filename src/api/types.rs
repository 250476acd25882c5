// src/api/types.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use crate::utils::error::FaceError;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";

/// Upper bound on one multipart request body, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

impl Default for UploadLimit {
    fn default() -> Self {
        Self(10 * 1024 * 1024)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceResponse {
    pub status: String,
    pub face_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub enrolled: usize,
    pub backend: String,
    pub version: String,
}

/// A [`FaceError`] on its way out of a handler, optionally tagged with the
/// faceId the request was about.
#[derive(Debug)]
pub struct ApiError {
    pub error: FaceError,
    pub face_id: Option<String>,
}

impl ApiError {
    pub fn with_face_id(mut self, face_id: &str) -> Self {
        self.face_id = Some(face_id.to_string());
        self
    }
}

impl From<FaceError> for ApiError {
    fn from(error: FaceError) -> Self {
        Self {
            error,
            face_id: None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

pub fn status_for(error: &FaceError) -> StatusCode {
    match error {
        FaceError::Validation(_) => StatusCode::BAD_REQUEST,
        FaceError::NoFaceDetected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FaceError::DuplicateIdentifier(_) => StatusCode::CONFLICT,
        FaceError::NoFacesEnrolled | FaceError::NoMatch => StatusCode::NOT_FOUND,
        FaceError::ImageProcessing { .. }
        | FaceError::Decryption(_)
        | FaceError::Config(_)
        | FaceError::Crypto(_)
        | FaceError::Storage(_)
        | FaceError::Extractor(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        status_for(&self.error)
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.error.is_internal() {
            error!("Request failed: {}", self.error);
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };

        HttpResponse::build(self.status_code()).json(FailureResponse {
            status: STATUS_FAIL.to_string(),
            message,
            face_id: self.face_id.clone(),
        })
    }
}
