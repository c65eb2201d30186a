use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct Smtp {
    pub host: String,
    pub port: u16,
    pub implicit_tls: bool,
    pub username: String,
    pub password: String,
    pub from: Option<String>,
    pub timeout_secs: u64,
}

impl Smtp {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

/// What a submission reports when it was stored but a notification email
/// could not be delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report the whole request as a server error.
    Strict,
    /// Report success and list the failed notifications as warnings.
    #[default]
    Lenient,
}

#[derive(Debug, Deserialize)]
pub struct Notifications {
    pub admin_email: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub postgres: Postgres,
    pub smtp: Smtp,
    pub notifications: Notifications,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("postgres.max_connections", 5)?
            .set_default("postgres.run_migrations", true)?
            .set_default("smtp.host", "smtp.gmail.com")?
            .set_default("smtp.port", 465)?
            .set_default("smtp.implicit_tls", true)?
            .set_default("smtp.timeout_secs", 30)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("REFERRALS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
