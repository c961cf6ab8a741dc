use crate::domain::errors::{DomainError, ValidationReason};
use sqlx::{
    any::{AnyConnectOptions, AnyPoolOptions},
    AnyPool, ConnectOptions,
};
use std::str::FromStr;
use std::time::Duration;

mod agents;
mod business_hours;
mod department_agents;
mod departments;

pub struct Database {
    pub(crate) pool: AnyPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        // Ensure drivers are installed for AnyPool
        sqlx::any::install_default_drivers();

        let mut connect_options = AnyConnectOptions::from_str(database_url)?;

        // Configure logging
        connect_options = connect_options
            .log_statements(log::LevelFilter::Info)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(1));

        let is_sqlite = database_url.starts_with("sqlite");

        // Per-connection settings; every pooled connection must wait on a
        // locked database instead of failing the claim statement outright.
        let pool = AnyPoolOptions::new()
            .max_connections(20)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if is_sqlite {
                        sqlx::query("PRAGMA busy_timeout = 5000")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA foreign_keys = ON")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA synchronous = NORMAL")
                            .execute(&mut *conn)
                            .await?;
                    }
                    Ok(())
                })
            })
            .connect_with(connect_options)
            .await?;

        // WAL persists in the database file, once is enough
        if is_sqlite {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
        }

        tracing::info!("Database pool ready (sqlite={})", is_sqlite);

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// "?, ?, ?" for an IN list of `count` binds
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// SQLITE_BUSY (5) or SQLITE_LOCKED (6), including their extended codes
fn is_busy_or_locked(code: Option<&str>) -> bool {
    code.and_then(|code| code.parse::<i32>().ok())
        .map(|code| matches!(code & 0xff, 5 | 6))
        .unwrap_or(false)
}

// Convert from sqlx errors
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut => DomainError::StorageTimeout,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if is_busy_or_locked(db_err.code().as_deref()) {
                    DomainError::StorageConflict(message.to_string())
                } else if db_err.is_unique_violation() {
                    DomainError::validation(
                        ValidationReason::DuplicateName,
                        format!("Name already in use: {}", message),
                    )
                } else {
                    DomainError::Internal(format!("Database error: {}", message))
                }
            }
            other => DomainError::Internal(format!("Database error: {}", other)),
        }
    }
}
