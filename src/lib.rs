//! solid_api - repository generico su SQL con paginazione keyset e servizi HTTP di supporto
//!
//! La libreria espone i moduli principali per il binario e per i test.

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;

// Re-export dei tipi principali per facilitare l'import
pub use self::core::{AppError, AppState, Config, auth, config};
pub use repositories::{QueryOptions, Repository, RepositoryError};
pub use services::root;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Crea il router principale dell'applicazione
///
/// `api` contiene le route di dominio; health check, tracing, contesto della
/// richiesta e CORS vengono aggiunti qui per tutte le route.
pub fn create_router(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    use services::*;

    Router::new()
        .route("/", get(root))
        .route("/health/db", get(database_health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(self::core::request_context_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Configura le routes degli item, tutte autenticate
pub fn configure_item_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use self::core::authentication_middleware;
    use services::items::*;

    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{item_id}", get(get_item).patch(update_item).delete(delete_item))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
