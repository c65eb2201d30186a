use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{referrals::ReferralRequestHandler, ServiceError};

mod referrals;
mod referrers;

#[derive(Clone)]
struct AppState {
    referrals: ReferralRequestHandler,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServiceError::Database(_) | ServiceError::Notification(_) => {
                log::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

pub fn router(handler: ReferralRequestHandler) -> Router {
    let app_state = AppState { referrals: handler };

    Router::new()
        .route(
            "/api/referrals",
            get(referrals::list_referrals).post(referrals::submit_referral),
        )
        .route("/api/referrals/{id}", get(referrals::get_referral))
        .route(
            "/api/referrals/{id}/status",
            patch(referrals::update_referral_status),
        )
        .route(
            "/api/referrers/{id}/stats",
            get(referrers::get_referrer_stats),
        )
        .route("/health", get(|| async { "OK" }))
        .fallback(not_found)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    handler: ReferralRequestHandler,
    address: &str,
) -> Result<(), anyhow::Error> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("HTTP server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, draining requests.");
}
