use std::sync::Arc;

use sqlx::PgPool;

use crate::{repositories::referrals::ReferralRepository, settings::Settings};

pub mod http;
pub mod notifications;
pub mod referrals;
pub mod validation;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<crate::repositories::StoreError> for ServiceError {
    fn from(e: crate::repositories::StoreError) -> Self {
        ServiceError::Database(e.to_string())
    }
}

/// Wires the store and mailer into the HTTP layer and serves until shutdown.
pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let store = Arc::new(ReferralRepository::new(pool));
    let mailer = Arc::new(notifications::SmtpMailer::new(&settings.smtp));

    let handler = referrals::ReferralRequestHandler::new(
        store,
        mailer,
        settings.notifications.admin_email,
        settings.notifications.failure_policy,
    );

    log::info!("Starting HTTP server.");
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    http::start_http_server(handler, &address).await
}
