//! STEM Assistant - OCR, PDF text and math explanation server.

mod analysis;
mod api;
mod config;
mod error;
mod math;
mod ocr;
mod pdf;
mod schema;
mod vision;

use api::AppState;
use config::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize tracing
    let default_filter = if config.debug {
        "stem_assistant=debug,tower_http=debug"
    } else {
        "stem_assistant=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded config: {:?}", config);
    if !config.vision_enabled() {
        warn!("GOOGLE_API_KEY not set; image endpoints will use OCR only");
    }

    let addr = config.bind_addr();
    let state = AppState::from_config(config);
    let app = api::router(state);

    // Run server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
