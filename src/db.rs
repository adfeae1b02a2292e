use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::migrator::Migrator;

/// Create the shared SeaORM connection pool.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);
    // Every pooled connection to `sqlite::memory:` would open its own empty database.
    if database_url.starts_with("sqlite::memory:") {
        options.max_connections(1).min_connections(1);
    } else {
        options.max_connections(20);
    }
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply every pending schema migration.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}
