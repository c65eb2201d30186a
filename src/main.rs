use std::{fs, path::Path};

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

mod models;
mod repositories;
pub mod services;
pub mod settings;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "referrals.toml")]
    config: String,
    /// Overrides `server.host` and `server.port`.
    #[arg(short, long)]
    listen: Option<String>,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log4rs)?;
    let mut settings = settings::Settings::new(&args.config).context("Could not load settings.")?;
    if let Some(listen) = args.listen {
        let (host, port) = listen
            .rsplit_once(':')
            .context("Listen address must be host:port.")?;
        settings.server.host = host.to_string();
        settings.server.port = port.parse().context("Invalid listen port.")?;
    }

    log::info!("Connecting to database.");
    let pool = PgPoolOptions::new()
        .max_connections(settings.postgres.max_connections)
        .connect(&settings.postgres.url)
        .await
        .context("Could not connect to database.")?;

    if settings.postgres.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Could not run database migrations.")?;
        log::info!("Database migrations applied.");
    }

    let result = services::start_services(pool.clone(), settings).await;

    pool.close().await;
    log::info!("Database pool closed.");

    result
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    log4rs::init_file(path, Default::default())
        .map_err(|e| anyhow::anyhow!("Could not initialize logging from {}: {}", path, e))?;
    log::info!("Logging initialized from {}.", path);

    Ok(())
}
