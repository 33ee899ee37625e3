use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::MigrateError;

/// Type alias kept for symmetry with multi-connection deployments;
/// this engine opens exactly one connection pool to one SQLite file.
pub type DbPool = DatabaseConnection;

/// Establishes a connection to the embedded database.
///
/// The migration engine is single-writer batch work, so the pool is
/// kept small; SQLite serializes writers anyway.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, MigrateError> {
    debug!("Configuring database connection for {}", database_url);

    let mut opt = ConnectOptions::new(database_url.to_string());
    opt.max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Connected to database");
    Ok(db)
}
