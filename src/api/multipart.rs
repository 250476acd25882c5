// src/api/multipart.rs
use actix_multipart::Multipart;
use futures::TryStreamExt;
use tracing::debug;

use crate::utils::error::FaceError;

pub const FACE_ID_FIELD: &str = "faceId";
pub const NAME_FIELD: &str = "name";
/// Any part whose field name starts with this is an image.
pub const IMAGE_FIELD_PREFIX: &str = "image";

#[derive(Debug)]
pub struct ImagePart {
    pub field: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct FaceForm {
    pub face_id: Option<String>,
    pub name: Option<String>,
    /// Non-empty image parts in form order.
    pub images: Vec<ImagePart>,
}

impl FaceForm {
    /// The part named exactly `image`, else the first image part.
    pub fn take_probe(self) -> Option<Vec<u8>> {
        let mut images = self.images;
        let index = images
            .iter()
            .position(|part| part.field == IMAGE_FIELD_PREFIX)
            .unwrap_or(0);
        if images.is_empty() {
            None
        } else {
            Some(images.swap_remove(index).data)
        }
    }

    pub fn image_data(&self) -> Vec<&[u8]> {
        self.images.iter().map(|part| part.data.as_slice()).collect()
    }
}

/// Reads the whole form, rejecting bodies larger than `limit` bytes.
pub async fn read_form(mut payload: Multipart, limit: usize) -> Result<FaceForm, FaceError> {
    let mut form = FaceForm::default();
    let mut total = 0usize;

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            total += chunk.len();
            if total > limit {
                return Err(FaceError::Validation(format!(
                    "Request body exceeds {} bytes",
                    limit
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            FACE_ID_FIELD => form.face_id = text_value(data)?,
            NAME_FIELD => form.name = text_value(data)?,
            other if other.starts_with(IMAGE_FIELD_PREFIX) => {
                // browsers send an empty part for an unselected file input
                if !data.is_empty() {
                    form.images.push(ImagePart {
                        field: other.to_string(),
                        data,
                    });
                }
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

fn text_value(data: Vec<u8>) -> Result<Option<String>, FaceError> {
    let value = String::from_utf8(data)
        .map_err(|_| FaceError::Validation("Form fields must be UTF-8".into()))?;
    let value = value.trim();
    Ok(if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    })
}

fn malformed(error: actix_multipart::MultipartError) -> FaceError {
    FaceError::Validation(format!("Malformed multipart body: {}", error))
}
