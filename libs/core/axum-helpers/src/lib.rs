//! # Axum Helpers
//!
//! Shared HTTP plumbing for the shop services.
//!
//! - **[`server`]**: router assembly (OpenAPI JSON, tracing, compression, 404
//!   fallback) and the graceful-shutdown server loop
//! - **[`health`]**: `/health` liveness endpoint
//! - **[`errors`]**: JSON error body used by the fallback handlers
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::{create_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! let router = create_router::<ApiDoc>(Router::new()).merge(health_router(app_info!()));
//! create_app(router, &ServerConfig::default()).await?;
//! ```

pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;

pub use errors::{ErrorResponse, method_not_allowed, not_found};
pub use health::{HealthResponse, health_router};
pub use server::{OPENAPI_JSON_PATH, create_app, create_router};
pub use shutdown::shutdown_signal;
