//! Database module providing connection management, migrations, and queries.

pub mod store;
pub mod subscriptions;
pub mod test_runs;
pub mod test_statuses;

use sea_orm::{
    sqlx, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, RuntimeErr,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;
use crate::store::StoreError;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect to PostgreSQL using the configured pool limits.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> AppResult<()> {
        let stmt = sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_owned(),
        );
        self.conn.query_one_raw(stmt).await?;
        Ok(())
    }
}

/// Map a database error onto the store error taxonomy.
///
/// Serialization failures (40001) and deadlocks (40P01) are conflicts;
/// connection failures are outages.
pub(crate) fn classify_db_err(err: DbErr) -> StoreError {
    let message = err.to_string();
    match &err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Unavailable(message),
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => {
            if is_serialization_failure(e) {
                StoreError::Conflict(message)
            } else if matches!(
                e.as_ref(),
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ) {
                StoreError::Unavailable(message)
            } else {
                StoreError::Backend(message)
            }
        }
        _ => StoreError::Backend(message),
    }
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    const SQLSTATES: [&str; 2] = ["40001", "40P01"];
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| SQLSTATES.contains(&code.as_ref()))
}
