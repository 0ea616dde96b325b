//! Database - pool di connessioni e apertura delle sessioni transazionali

use crate::core::config::Config;
use crate::core::observability::bind_session;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Transazione aperta da [`SessionProvider::begin`]
pub type Session = Transaction<'static, Sqlite>;

#[instrument(skip(config), fields(database = %Config::mask_url(&config.database_url)))]
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    debug!("Connecting to database");
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .max_lifetime(Duration::from_secs(config.connection_lifetime_secs))
        .connect(&config.database_url)
        .await?;
    info!("Database connection pool ready");
    Ok(pool)
}

/// Fornisce sessioni (transazioni) a partire dal pool condiviso
#[derive(Clone, Debug)]
pub struct SessionProvider {
    pool: SqlitePool,
}

impl SessionProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apre una transazione e lega un nuovo session id al contesto di logging.
    ///
    /// Il commit spetta al chiamante: se la sessione viene droppata senza commit
    /// la transazione viene annullata.
    pub async fn begin(&self) -> Result<Session, sqlx::Error> {
        let session = self.pool.begin().await?;
        let session_id = Uuid::new_v4().to_string();
        bind_session(&session_id);
        debug!(%session_id, "Transaction begin");
        Ok(session)
    }
}
