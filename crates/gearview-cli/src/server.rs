//! Static server for the built viewer

use anyhow::Result;
use axum::{http::header, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::ServerConfig;

/// Build the router
///
/// - `/catalog.toml` answers the active part catalog, for `?catalog=/catalog.toml`
/// - `/models/*` serves the static sample models
/// - everything else falls through to the viewer bundle
pub fn router(config: &ServerConfig, catalog_toml: String) -> Router {
    let catalog_toml = Arc::new(catalog_toml);

    Router::new()
        .route(
            "/catalog.toml",
            get(move || {
                let body = catalog_toml.clone();
                async move { ([(header::CONTENT_TYPE, "application/toml")], body.as_str().to_owned()) }
            }),
        )
        .nest_service("/models", ServeDir::new(&config.models_dir))
        // Static files (WASM viewer) - must be fallback for root
        .fallback_service(ServeDir::new(&config.web_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve until the process is stopped
pub async fn run(config: &ServerConfig, catalog_toml: String) -> Result<()> {
    let app = router(config, catalog_toml);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        address = %config.bind,
        web = %config.web_dir.display(),
        models = %config.models_dir.display(),
        "Starting web server"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
