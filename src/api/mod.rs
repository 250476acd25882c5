pub mod handlers;
pub mod multipart;
pub mod types;

use actix_cors::Cors;

/// `"*"` anywhere in the list allows every origin.
pub fn cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return Cors::permissive();
    }

    allowed_origins.iter().fold(
        Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_any_header()
            .supports_credentials()
            .max_age(3600),
        |cors, origin| cors.allowed_origin(origin),
    )
}
