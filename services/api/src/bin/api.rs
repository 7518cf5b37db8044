//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        illustration::{parse_image_model, parse_image_size},
        tts::parse_voice,
        DbAdapter, MemoryStore, OpenAiIllustrationAdapter, OpenAiStoryAdapter, OpenAiTtsAdapter,
    },
    config::Config,
    error::ApiError,
    web::{app_router, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, types::audio::SpeechModel, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use story_weaver_core::ports::{StoryRepository, UserRepository};
use story_weaver_core::workflow::StoryWorkflow;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Storage & Run Migrations ---
    let (stories, users): (Arc<dyn StoryRepository>, Arc<dyn UserRepository>) =
        match &config.database_url {
            Some(database_url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                (
                    db_adapter.clone() as Arc<dyn StoryRepository>,
                    db_adapter as Arc<dyn UserRepository>,
                )
            }
            None => {
                warn!("DATABASE_URL not set, stories are kept in memory only");
                let store = Arc::new(MemoryStore::new());
                (
                    store.clone() as Arc<dyn StoryRepository>,
                    store as Arc<dyn UserRepository>,
                )
            }
        };

    // --- 3. Initialize Provider Adapters ---
    let openai_api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(openai_api_key)
        .with_api_base(config.openai_base_url.clone());
    let openai_client = Client::with_config(openai_config);

    let story_adapter = Arc::new(OpenAiStoryAdapter::new(
        openai_client.clone(),
        config.story_model.clone(),
    ));

    let image_size = parse_image_size(&config.image_size).ok_or_else(|| {
        ApiError::Internal(format!(
            "Invalid image size specified in config: '{}'",
            config.image_size
        ))
    })?;
    let illustration_adapter = Arc::new(OpenAiIllustrationAdapter::new(
        openai_client.clone(),
        reqwest::Client::new(),
        parse_image_model(&config.image_model),
        image_size,
    ));

    let tts_voice = parse_voice(&config.tts_voice).ok_or_else(|| {
        ApiError::Internal(format!(
            "Invalid TTS voice specified in config: '{}'",
            config.tts_voice
        ))
    })?;
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        openai_client,
        SpeechModel::Tts1Hd,
        tts_voice,
    ));

    // --- 4. Build the Shared AppState ---
    let workflow = StoryWorkflow::new(stories, story_adapter, illustration_adapter, tts_adapter)
        .with_illustration_on_create(config.illustrate_on_create);
    let app_state = Arc::new(AppState {
        workflow: Arc::new(workflow),
        users,
        config: config.clone(),
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = app_router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
