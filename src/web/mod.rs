/// HTTP front end
///
/// An upload form at `/`, the upload handler that runs the analysis, report
/// downloads and the static folder holding the heatmap.

pub mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use handlebars::Handlebars;
use log::{error, info};
use tower_http::services::ServeDir;

use crate::config::AppConfig;
use crate::core::analyzer::FileAnalyzer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub templates: Arc<Handlebars<'static>>,
    pub analyzer: Arc<FileAnalyzer>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(routes::INDEX_TEMPLATE_NAME, routes::INDEX_TEMPLATE)
            .context("Failed to register page template")?;

        let analyzer = FileAnalyzer::for_web(&config);

        Ok(Self {
            config: Arc::new(config),
            templates: Arc::new(templates),
            analyzer: Arc::new(analyzer),
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_folder);
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(routes::index))
        .route("/upload", post(routes::upload))
        .route("/download/:filename", get(routes::download))
        .nest_service("/static", static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("Shutdown requested, finishing in-flight requests");
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: AppConfig) -> Result<()> {
    config.ensure_dirs()?;
    let bind_address = config.bind_address.clone();
    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
