//! Application State - Stato globale dell'applicazione
//!
//! Contiene il pool, le impostazioni e lo stato condiviso necessario
//! per costruire i repository di ogni richiesta.

use crate::core::config::RepositorySettings;
use crate::core::database::SessionProvider;
use crate::repositories::{DbConnection, Entity, IndexCache, Repository};
use crate::services::jwt::JwtService;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Pool di connessioni condiviso
    pub pool: SqlitePool,

    /// Apertura delle transazioni per richiesta
    pub sessions: SessionProvider,

    pub repository_settings: Arc<RepositorySettings>,

    /// Indici compositi già verificati, condivisi da tutti i repository
    pub indexes: IndexCache,

    /// Emissione e verifica dei token JWT
    pub jwt: JwtService,
}

impl AppState {
    /// Crea una nuova istanza di AppState
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni condiviso
    /// * `repository_settings` - Limiti e opzioni di logging dei repository
    /// * `jwt` - Servizio per la firma e la verifica dei token
    pub fn new(pool: SqlitePool, repository_settings: RepositorySettings, jwt: JwtService) -> Self {
        Self {
            sessions: SessionProvider::new(pool.clone()),
            pool,
            repository_settings: Arc::new(repository_settings),
            indexes: IndexCache::new(),
            jwt,
        }
    }

    /// Repository per `E` che lavora sulla sessione indicata
    pub fn repository<'s, E: Entity>(&self, session: &'s mut DbConnection) -> Repository<'s, E> {
        Repository::new(session, self.repository_settings.clone(), self.indexes.clone())
    }
}
