use actix_web::{
    web::{self, Data},
    HttpResponse,
};

use crate::{
    api::types::{ApiError, HealthResponse},
    storage::TemplateStore,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)));
}

async fn health(store: Data<dyn TemplateStore>) -> Result<HttpResponse, ApiError> {
    let enrolled = store.count().await?;

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        enrolled,
        backend: store.backend_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
