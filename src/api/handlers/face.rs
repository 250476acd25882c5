use actix_multipart::Multipart;
use actix_web::{
    web::{self, Data},
    HttpResponse,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    api::{
        multipart::read_form,
        types::{ApiError, FaceResponse, UploadLimit, STATUS_SUCCESS},
    },
    core::services::{enrollment::EnrollmentService, verification::VerificationService},
    utils::error::FaceError,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/enroll-face")
            .route(web::post().to(enroll_face))
    )
    .service(
        web::resource("/verify-face")
            .route(web::post().to(verify_face))
    );
}

fn upload_limit(limit: Option<Data<UploadLimit>>) -> usize {
    limit.map(|l| l.0).unwrap_or_else(|| UploadLimit::default().0)
}

async fn enroll_face(
    service: Data<EnrollmentService>,
    limit: Option<Data<UploadLimit>>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();

    async move {
        let form = read_form(payload, upload_limit(limit)).await?;

        let face_id = match (&form.face_id, form.images.is_empty()) {
            (Some(face_id), false) => face_id.clone(),
            (None, _) => {
                return Err(FaceError::Validation("faceId is required".into()).into());
            }
            (Some(_), true) => {
                return Err(FaceError::Validation("At least one image is required".into()).into());
            }
        };
        info!(face_id = %face_id, images = form.images.len(), "Received enrollment request");

        let outcome = service
            .enroll(&face_id, form.name.clone(), &form.image_data())
            .await
            .map_err(|e| {
                warn!(face_id = %face_id, "Enrollment failed: {}", e);
                ApiError::from(e).with_face_id(&face_id)
            })?;

        let label = outcome.name.as_deref().unwrap_or(&outcome.face_id);
        Ok::<_, ApiError>(HttpResponse::Ok().json(FaceResponse {
            status: STATUS_SUCCESS.to_string(),
            message: format!("Face for {} enrolled successfully.", label),
            face_id: outcome.face_id.clone(),
            name: outcome.name.clone(),
        }))
    }
    .instrument(info_span!("enroll_face", %request_id))
    .await
}

async fn verify_face(
    service: Data<VerificationService>,
    limit: Option<Data<UploadLimit>>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();

    async move {
        let form = read_form(payload, upload_limit(limit)).await?;
        let image = form
            .take_probe()
            .ok_or_else(|| FaceError::Validation("Image is required".into()))?;
        info!(bytes = image.len(), "Received verification request");

        let outcome = service.verify(&image).await.map_err(|e| {
            info!("Verification failed: {}", e);
            ApiError::from(e)
        })?;

        Ok::<_, ApiError>(HttpResponse::Ok().json(FaceResponse {
            status: STATUS_SUCCESS.to_string(),
            face_id: outcome.face_id,
            message: "Face verified".to_string(),
            name: None,
        }))
    }
    .instrument(info_span!("verify_face", %request_id))
    .await
}
