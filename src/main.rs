use anyhow::{Context, Result};
use article_translation_sync::config::Config;
use article_translation_sync::provider::{
    OpenAiProvider, PlaceholderProvider, TranslationProvider,
};
use article_translation_sync::server::{self, AppState};
use article_translation_sync::store::PgStore;
use article_translation_sync::sync::TranslationSync;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("article_translation_sync=info".parse()?),
        )
        .init();

    info!("Starting article translation sync");

    // Load configuration from environment; TranslationSync::from_config validates it
    let config = Config::from_env()?;

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL not set")?;
    let store = Arc::new(
        PgStore::connect(&database_url)
            .await
            .context("Failed to connect to database")?,
    );

    let provider: Arc<dyn TranslationProvider> = match &config.openai_api_key {
        Some(api_key) => {
            info!("Using OpenAI translation provider ({})", config.openai_model);
            Arc::new(OpenAiProvider::new(
                reqwest::Client::new(),
                &config.openai_api_url,
                api_key,
                &config.openai_model,
            ))
        }
        None => {
            warn!("OPENAI_API_KEY not set, using the placeholder translation provider");
            Arc::new(PlaceholderProvider::new())
        }
    };

    let sync = Arc::new(TranslationSync::from_config(&config, store, provider)?);
    let app = server::router(AppState::new(sync, config.api_key.clone()));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
