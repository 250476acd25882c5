pub mod face;
pub mod health;

use actix_web::{web, Scope};

/// Every route lives under `/api`.
pub fn scope() -> Scope {
    web::scope("/api")
        .configure(face::configure)
        .configure(health::configure)
}
