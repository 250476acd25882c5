pub mod api;
pub mod core;
pub mod storage;
pub mod utils;

use std::sync::Arc;
use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::{
    api::types::UploadLimit,
    core::{
        crypto::{cipher::TemplateCipher, key_manager::KeyManager},
        identity::{
            extractor::DescriptorExtractor,
            matcher::Matcher,
            remote::HttpExtractor,
            template::{ImagePolicy, TemplateBuilder},
        },
        services::{enrollment::EnrollmentService, verification::VerificationService},
    },
    storage::{open_store, TemplateStore},
    utils::{config::Config, error::{Result, FaceError}},
};

pub struct Application {
    config: Arc<Config>,
    enrollment_service: Arc<EnrollmentService>,
    verification_service: Arc<VerificationService>,
    storage: Arc<dyn TemplateStore>,
}

impl Application {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Loading encryption key...");
        let key = KeyManager::new(&config.crypto).load()?;
        let cipher = Arc::new(TemplateCipher::from_material(&key)?);
        drop(key);

        info!("Initializing storage...");
        let storage = open_store(&config.storage).await?;

        info!("Initializing descriptor extractor...");
        let extractor = HttpExtractor::new(&config.extractor)?;
        info!("Descriptor service at {}", extractor.endpoint());

        Ok(Self::with_components(config, Arc::new(extractor), storage, cipher))
    }

    /// Assembles the services around already constructed collaborators.
    pub fn with_components(
        config: Config,
        extractor: Arc<dyn DescriptorExtractor>,
        storage: Arc<dyn TemplateStore>,
        cipher: Arc<TemplateCipher>,
    ) -> Self {
        let builder = Arc::new(TemplateBuilder::new(
            extractor,
            ImagePolicy::from(&config.enrollment),
        ));

        let enrollment_service = Arc::new(EnrollmentService::new(
            builder.clone(),
            cipher.clone(),
            storage.clone(),
        ));
        let verification_service = Arc::new(VerificationService::new(
            builder,
            cipher,
            storage.clone(),
            Matcher::new(config.matching.tolerance),
        ));

        Self {
            config: Arc::new(config),
            enrollment_service,
            verification_service,
            storage,
        }
    }

    /// Serves the API until the server receives a shutdown signal.
    pub async fn run(&self) -> Result<()> {
        use crate::api::{cors, handlers};

        let enrollment_service = self.enrollment_service.clone();
        let verification_service = self.verification_service.clone();
        let storage = self.storage.clone();
        let upload_limit = UploadLimit(self.config.server.max_request_size);
        let origins = self.config.server.cors_allowed_origins.clone();

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(cors(&origins))
                .app_data(web::Data::from(enrollment_service.clone()))
                .app_data(web::Data::from(verification_service.clone()))
                .app_data(web::Data::from(storage.clone()))
                .app_data(web::Data::new(upload_limit))
                .service(handlers::scope())
        });
        if let Some(workers) = self.config.server.workers {
            server = server.workers(workers);
        }

        let server = server
            .bind((
                self.config.server.host.as_str(),
                self.config.server.port,
            ))
            .map_err(|e| FaceError::Config(format!("Failed to bind API server: {}", e)))?;

        info!(
            "API listening on {}:{}",
            self.config.server.host, self.config.server.port
        );
        server
            .run()
            .await
            .map_err(|e| FaceError::Config(format!("API server failed: {}", e)))?;

        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        info!("Flushing storage...");
        self.storage.flush().await?;

        info!("Application shutdown complete");
        Ok(())
    }
}
