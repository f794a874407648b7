use axum_helpers::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_products::ApiDoc;
use tracing::info;

mod api;
mod config;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation, for colored error reports
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let state = api::catalog_state(&config).await?;

    // create_router adds /api, the OpenAPI document, tracing and fallbacks
    let app = create_router::<ApiDoc>(api::routes(state)).merge(health_router(config.app));

    info!(
        upload_dir = %config.uploads.dir.display(),
        redis = config.redis.is_enabled(),
        nats = config.nats_url.is_some(),
        "Starting shop API"
    );

    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Shop API shutdown complete");
    Ok(())
}
