//! Portal Admin Backend
//!
//! REST backend of the portal admin dashboard. Career and activity collections live as
//! JSON documents in a GitHub repository (or a local directory) and are edited through
//! a local draft that is published with optimistic, revision-checked writes.

mod api;
mod assets;
mod config;
mod draft;
mod editor;
mod errors;
mod models;
mod publish;
mod store;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use assets::ImageUploader;
use config::{Config, LogFormat};
use draft::{DraftCache, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use editor::CollectionEditor;
use errors::AppError;
use models::{Activity, Career};
use publish::Publisher;
use store::DocumentStore;

/// Editor of one collection, shared between handlers.
pub type SharedEditor<R> = Arc<Mutex<CollectionEditor<R>>>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub uploader: Arc<ImageUploader>,
    pub publisher: Arc<Publisher>,
    pub careers: SharedEditor<Career>,
    pub activities: SharedEditor<Activity>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Portal Admin Backend");
    tracing::info!("Store backend: {:?}", config.store);
    tracing::info!("Careers document: {}", config.careers_path);
    tracing::info!("Activities document: {}", config.activities_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.snapshot_dir.is_none() {
        tracing::warn!(
            "No snapshot directory configured (PORTAL_SNAPSHOT_DIR). Drafts will not survive a restart!"
        );
    }

    let state = build_state(&config).await?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the store and restore both drafts.
pub async fn build_state(config: &Config) -> Result<AppState, AppError> {
    let store = store::open_store(&config.store)?;

    let snapshots: Arc<dyn KeyValueStore> = match &config.snapshot_dir {
        Some(dir) => Arc::new(FileKeyValueStore::new(dir)),
        None => Arc::new(MemoryKeyValueStore::new()),
    };
    let defaults = Arc::new(config.defaults.clone());

    let mut careers = DraftCache::<Career>::new(
        config.careers_path.clone(),
        store.clone(),
        snapshots.clone(),
    );
    let source = careers.recover().await;
    tracing::info!("Careers draft ready ({:?}, {} records)", source, careers.records().len());

    let mut activities = DraftCache::<Activity>::new(
        config.activities_path.clone(),
        store.clone(),
        snapshots,
    );
    let source = activities.recover().await;
    tracing::info!(
        "Activities draft ready ({:?}, {} records)",
        source,
        activities.records().len()
    );

    let uploader = ImageUploader::new(
        store.clone(),
        config.storage_root.clone(),
        config.max_image_bytes,
        config.retry,
    );
    let publisher = Publisher::new(
        store.clone(),
        config.retry,
        config.descriptions_dir.clone(),
    );

    Ok(AppState {
        store,
        uploader: Arc::new(uploader),
        publisher: Arc::new(publisher),
        careers: Arc::new(Mutex::new(CollectionEditor::new(
            careers,
            defaults.clone(),
            config.first_record_id,
        ))),
        activities: Arc::new(Mutex::new(CollectionEditor::new(
            activities,
            defaults,
            config.first_record_id,
        ))),
        config: Arc::new(config.clone()),
    })
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Twice the image limit covers base64 inflation, so an oversized image still reaches
    // the handler and gets its precise 413
    let body_limit = state.config.max_image_bytes * 2 + 1024 * 1024;

    // API routes
    let api_routes = Router::new()
        // Collection documents
        .route("/careers/save", post(api::save_careers))
        .route("/activities/save", post(api::save_activities))
        // GitHub-flavoured endpoints used by the dashboard
        .route("/github/save-career", post(api::save_career))
        .route("/github/save-activity", post(api::save_activities))
        .route("/github/save-description", post(api::save_description))
        .route("/github/upload-image", post(api::upload_image))
        // Multipart upload used by the activity panel
        .route("/images/upload", post(api::upload_image_form))
        // Drafts
        .merge(api::draft_routes::<Career>("/drafts/careers"))
        .merge(api::draft_routes::<Activity>("/drafts/activities"))
        .route("/test", get(api::test_endpoint));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .fallback(api::not_found)
        .method_not_allowed_fallback(api::method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
