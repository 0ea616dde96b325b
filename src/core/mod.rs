//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Autenticazione
//! - Configurazione
//! - Database e sessioni
//! - Gestione errori
//! - Logging e contesto della richiesta
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{authentication_middleware, require_scope};
pub use config::{Config, ConfigError, Environment, ObservabilitySettings, RepositorySettings, TokenServiceSettings};
pub use database::{Session, SessionProvider, connect};
pub use error::AppError;
pub use observability::{RequestContext, current_trace_ids, init_logging, request_context_middleware};
pub use state::AppState;
