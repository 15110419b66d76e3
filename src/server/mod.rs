//! HTTP transport for bundle validation.

pub mod error;
pub mod routes;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::core::{ServerSettings, ValidatorConfig};
use crate::validation::BundleValidator;

pub use error::{Result, ServerError};

/// Shared per-process state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub validator: Arc<BundleValidator>,
}

impl AppState {
    pub fn new(validator: BundleValidator) -> Self {
        Self {
            validator: Arc::new(validator),
        }
    }
}

pub struct Server {
    settings: ServerSettings,
    state: AppState,
}

impl Server {
    /// Build a server with the standard validation pipeline.
    pub fn new(config: &ValidatorConfig) -> Result<Self> {
        let validator = BundleValidator::from_config(config)?;
        Ok(Self::with_validator(config.server.clone(), validator))
    }

    pub fn with_validator(settings: ServerSettings, validator: BundleValidator) -> Self {
        Self {
            settings,
            state: AppState::new(validator),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), &self.settings)
    }

    /// Bind and serve until Ctrl+C or SIGTERM.
    pub async fn start(self) -> Result<()> {
        let app = self.router();
        let listener =
            tokio::net::TcpListener::bind((self.settings.host.as_str(), self.settings.port))
                .await?;

        info!(address = %listener.local_addr()?, "Starting bundle validator server");

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {e}")))?;

        info!("Server stopped gracefully");
        Ok(())
    }
}

/// Routes plus the body limit, timeout and tracing layers.
pub fn router(state: AppState, settings: &ServerSettings) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/validate/bundle",
            post(routes::validation::validate_bundle),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::max(settings.max_body_size))
        .layer(TimeoutLayer::new(settings.request_timeout()))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    warn!("Starting graceful shutdown...");
}
