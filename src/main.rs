use std::{sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analytics;
mod auth;
mod aws_clients;
mod captioner;
mod config;
mod domain;
mod errors;
mod handlers;
mod listing;
mod models;
mod repositories;
mod routes;
mod startup;
mod storage;
mod tally;

use crate::auth::HttpIdentityProvider;
use crate::aws_clients::{create_dynamodb_client, create_s3_client, create_sdk_config};
use crate::captioner::HttpCaptionGenerator;
use crate::config::Config;
use crate::domain::{
    CaptionGenerator, CaptionRepository, FlavorRepository, IdentityProvider, ImageRepository,
    MediaStorage, VoteRepository,
};
use crate::errors::AppError;
use crate::repositories::{
    DynamoDbCaptionRepository, DynamoDbFlavorRepository, DynamoDbImageRepository,
    DynamoDbVoteRepository,
};
use crate::storage::S3MediaStorage;

/// AppState holds shared resources for the web server. Handlers see only the
/// trait objects, never the concrete AWS or HTTP clients.
pub struct AppState {
    pub caption_repo: Arc<dyn CaptionRepository>,
    pub vote_repo: Arc<dyn VoteRepository>,
    pub image_repo: Arc<dyn ImageRepository>,
    pub flavor_repo: Arc<dyn FlavorRepository>,
    pub media_storage: Arc<dyn MediaStorage>,
    pub captioner: Arc<dyn CaptionGenerator>,
    pub identity: Arc<dyn IdentityProvider>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "caption_board=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present (optional, good for development)
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(".env file loaded from path: {}", path.display()),
        Err(_) => tracing::info!(".env file not found, relying on environment variables"),
    };

    let config = Config::load()?;

    // One HTTP client shared by every outbound call. The timeout lives on the
    // client so a stalled upstream cannot hold a handler open indefinitely.
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::InitError(format!("Failed to build HTTP client: {}", e)))?;

    tracing::info!("Startup: Initializing AWS clients...");
    let sdk_config = create_sdk_config(&config).await?;
    let db_client = create_dynamodb_client(&sdk_config);
    let s3_client = create_s3_client(&sdk_config, &config);

    startup::init_resources(
        &db_client,
        &s3_client,
        &config.media_bucket_name,
        &config.aws_region,
    )
    .await?;

    let state = Arc::new(AppState {
        caption_repo: Arc::new(DynamoDbCaptionRepository::new(
            db_client.clone(),
            startup::CAPTIONS_TABLE.to_string(),
        )),
        vote_repo: Arc::new(DynamoDbVoteRepository::new(
            db_client.clone(),
            startup::VOTES_TABLE.to_string(),
        )),
        image_repo: Arc::new(DynamoDbImageRepository::new(
            db_client.clone(),
            startup::IMAGES_TABLE.to_string(),
        )),
        flavor_repo: Arc::new(DynamoDbFlavorRepository::new(
            db_client,
            startup::FLAVORS_TABLE.to_string(),
        )),
        media_storage: Arc::new(S3MediaStorage::new(
            s3_client,
            config.media_bucket_name.clone(),
            &config.aws_region,
            config.localstack_endpoint.as_deref(),
            config.upload_url_ttl_secs,
        )),
        captioner: Arc::new(HttpCaptionGenerator::new(
            http_client.clone(),
            config.caption_api_url.clone(),
            config.caption_api_token.clone(),
        )),
        identity: Arc::new(HttpIdentityProvider::new(
            http_client,
            config.identity_api_url.clone(),
        )),
    });

    let app = routes::create_router(state);

    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
