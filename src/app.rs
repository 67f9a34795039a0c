//! Application wiring: service construction and the HTTP router.

use crate::docstore::{MongoSubmissionStore, SubmissionStore};
use crate::handlers;
use crate::models::Config;
use crate::objectstore::client::S3Settings;
use crate::objectstore::{MockObjectStore, ObjectStore, S3ObjectStore};
use crate::{Error, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared request state: the two storage backends plus routing options.
#[derive(Clone)]
pub struct App {
    pub store: Arc<dyn SubmissionStore>,
    pub objects: Arc<dyn ObjectStore>,
    options: Arc<AppOptions>,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub store: Arc<dyn SubmissionStore>,
    pub objects: Arc<dyn ObjectStore>,
}

#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Key prefix for uploaded images.
    pub image_folder: String,
    /// The single origin allowed by CORS.
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            image_folder: "user_images".to_string(),
            cors_origin: "http://127.0.0.1:5500".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl From<&Config> for AppOptions {
    fn from(config: &Config) -> Self {
        Self {
            image_folder: config.object_store_folder.clone(),
            cors_origin: config.cors_origin.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Object store for `DRY_RUN`: keys are recorded, bytes are dropped. Local
/// use only, since the placeholder URLs still land in the database.
fn dry_run_object_store(config: &Config) -> MockObjectStore {
    let store = MockObjectStore::new().without_contents();
    match &config.object_store_base_url {
        Some(base_url) => store.with_base_url(base_url.trim_end_matches('/').to_string()),
        None => store,
    }
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, options: AppOptions) -> Self {
        Self {
            store: services.store,
            objects: services.objects,
            options: Arc::new(options),
        }
    }

    /// Connect to MongoDB and build the object store client from `config`.
    ///
    /// Fails if the database cannot be reached. Missing object store
    /// credentials only warn; uploads will fail until they are set.
    pub async fn new(config: &Config) -> Result<Self> {
        let store =
            MongoSubmissionStore::connect(&config.mongodb_uri, &config.mongodb_db_name).await?;

        let objects: Arc<dyn ObjectStore> = if config.dry_run {
            warn!("DRY_RUN enabled, uploads are discarded and image URLs are placeholders");
            Arc::new(dry_run_object_store(config))
        } else {
            let missing = config.missing_object_store_settings();
            if !missing.is_empty() {
                warn!("Object store not fully configured, missing: {}", missing.join(", "));
            }

            Arc::new(
                S3ObjectStore::new(S3Settings {
                    access_key_id: config.object_store_access_key_id.clone().unwrap_or_default(),
                    secret_access_key: config
                        .object_store_secret_access_key
                        .clone()
                        .unwrap_or_default(),
                    endpoint: config.object_store_endpoint.clone(),
                    region: config.object_store_region.clone(),
                    bucket: config.object_store_bucket.clone().unwrap_or_default(),
                    base_url: config.object_store_base_url.clone(),
                })
                .await?,
            )
        };

        Ok(Self::with_services(
            AppServices {
                store: Arc::new(store),
                objects,
            },
            AppOptions::from(config),
        ))
    }

    pub fn image_folder(&self) -> &str {
        &self.options.image_folder
    }

    fn cors_layer(&self) -> Result<CorsLayer> {
        let origin = HeaderValue::from_str(&self.options.cors_origin).map_err(|e| {
            Error::Config(format!(
                "Invalid CORS origin '{}': {}",
                self.options.cors_origin, e
            ))
        })?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list([origin]))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true))
    }

    pub fn router(&self) -> Result<Router> {
        Ok(Router::new()
            .route("/submit-data", post(handlers::submit_data))
            .route("/fetch-data", get(handlers::fetch_data))
            .layer(DefaultBodyLimit::max(self.options.max_upload_bytes))
            .layer(self.cors_layer()?)
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone()))
    }
}
