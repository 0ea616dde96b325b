use solid_api::core::{AppState, Config, connect, init_logging};
use solid_api::entities::Item;
use solid_api::services::{EnvSecretStore, JwtService};
use solid_api::{configure_item_routes, create_router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza la configurazione
    let config = Config::from_env()?;
    init_logging(&config.observability);
    config.print_info();

    // Pool e schema
    let pool = connect(&config).await.map_err(|e| {
        error!("Unable to connect to the database: {}", e);
        e
    })?;
    sqlx::raw_sql(Item::SCHEMA).execute(&pool).await?;

    // Chiave di firma dal secret store
    let secrets = EnvSecretStore::new();
    let jwt = JwtService::from_secret_store(config.tokens.clone(), &secrets).await?;

    let state = Arc::new(AppState::new(pool, config.repository.clone(), jwt));
    let app = create_router(state.clone(), configure_item_routes(state));

    // Crea il listener TCP
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    // Avvia il server
    axum::serve(listener, app).await?;

    Ok(())
}
