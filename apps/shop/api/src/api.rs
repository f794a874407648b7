use axum::Router;
use domain_products::{
    handlers, CatalogBuilder, CatalogState, NatsEventPublisher, RedisProductCache,
    StaticLocalizer, UploadValidator,
};
use eyre::WrapErr;
use tracing::{info, warn};

use crate::config::Config;

/// Assemble the catalog from configuration.
///
/// Redis is required once `REDIS_URL` is set; NATS is best effort.
pub async fn catalog_state(config: &Config) -> eyre::Result<CatalogState> {
    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .wrap_err_with(|| format!("Cannot create upload dir {}", config.uploads.dir.display()))?;

    let mut catalog = CatalogBuilder::in_memory(config.uploads.dir.clone())
        .with_validator(UploadValidator::new(
            config.uploads.max_files,
            config.uploads.max_file_size,
        ))
        .with_localizer(StaticLocalizer::from_tag(&config.locale.language));

    if let Some(url) = &config.redis.url {
        let cache = RedisProductCache::connect(url, config.redis.ttl_seconds)
            .await
            .wrap_err("Redis connection failed")?;
        catalog = catalog.with_cache(cache);
    } else {
        info!("REDIS_URL not set, caching listings in memory");
    }

    if let Some(url) = &config.nats_url {
        info!("Connecting to NATS at {}", url);
        match NatsEventPublisher::connect(url).await {
            Ok(publisher) => catalog = catalog.with_events(publisher),
            Err(e) => warn!("Failed to connect to NATS, events will only be logged: {}", e),
        }
    }

    Ok(catalog.build())
}

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: CatalogState) -> Router {
    handlers::api_router(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum_helpers::{create_router, health_router};
    use core_config::{
        locale::LocaleConfig, redis::RedisConfig, server::ServerConfig, uploads::UploadConfig,
        AppInfo, Environment,
    };
    use domain_products::ApiDoc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            app: AppInfo {
                name: "shop_api",
                version: "test",
            },
            server: ServerConfig::default(),
            redis: RedisConfig {
                url: None,
                ttl_seconds: 60,
            },
            uploads: UploadConfig {
                dir: dir.join("images"),
                ..UploadConfig::default()
            },
            locale: LocaleConfig {
                language: "en".to_string(),
            },
            nats_url: None,
            environment: Environment::Development,
        }
    }

    #[tokio::test]
    async fn test_full_app_serves_products_under_api_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let state = catalog_state(&config).await.unwrap();
        assert!(config.uploads.dir.is_dir());

        let app = create_router::<ApiDoc>(routes(state)).merge(health_router(config.app));

        let response = app
            .clone()
            .oneshot(Request::get("/api/v1/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"products":[],"total_pages":0}"#);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
