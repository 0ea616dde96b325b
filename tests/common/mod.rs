#![allow(dead_code)]

use axum_test::TestServer;
use solid_api::core::{AppState, RepositorySettings, TokenServiceSettings};
use solid_api::entities::Item;
use solid_api::services::JwtService;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::io;
use std::sync::{Arc, Mutex};

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

/// Crea un database SQLite in memoria con lo schema degli item
///
/// Una sola connessione, mai chiusa: il database in memoria vive quanto la connessione.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::raw_sql(Item::SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to create schema");

    pool
}

pub fn create_test_jwt_service() -> JwtService {
    JwtService::new(TokenServiceSettings::default(), JWT_SECRET).expect("Failed to create JWT service")
}

/// Crea un AppState per i test
///
/// # Arguments
/// * `pool` - Connection pool SQLite
/// * `settings` - Impostazioni dei repository
pub fn create_test_state_with(pool: SqlitePool, settings: RepositorySettings) -> Arc<AppState> {
    Arc::new(AppState::new(pool, settings, create_test_jwt_service()))
}

pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    create_test_state_with(pool, RepositorySettings::default())
}

/// Crea un TestServer con le route degli item
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = solid_api::create_router(state.clone(), solid_api::configure_item_routes(state));
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un access token valido con gli scope indicati
pub fn create_test_jwt(user_id: &str, scopes: &[&str]) -> String {
    let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
    create_test_jwt_service()
        .create_access_token(user_id, &scopes)
        .expect("Failed to create JWT token")
}

/// Output testuale dei log emessi mentre il guard di [`capture_logs`] è attivo
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installa un subscriber fmt sul thread corrente che scrive in memoria
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
