//! City registry server binary.

use anyhow::Result;
use city_registry::cli::{Cli, Command};
use city_registry::{CityService, CityStore, router};
use clap::Parser;
use diesel::{Connection, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            db_path,
        } => serve(host, port, db_path).await,
    }
}

/// Run the REST API server
async fn serve(host: String, port: u16, db_path: Option<String>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = db_path
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "city_registry.db".to_string());

    info!(path = %db_path, "Applying pending migrations");
    let mut conn = SqliteConnection::establish(&db_path)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    drop(conn);

    let service = CityService::new(CityStore::new(db_path));
    let app = router(service);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(%host, port, "City registry listening");
    axum::serve(listener, app).await?;

    Ok(())
}
