//! Services module - servizi applicativi e handler HTTP di base
//!
//! - `health`: endpoint di stato
//! - `jwt`/`jwk`: emissione e verifica dei token
//! - `secrets`: accesso ai segreti

pub mod health;
pub mod items;
pub mod jwk;
pub mod jwt;
pub mod secrets;

// Re-exports per facilitare l'import
pub use health::{database_health, root};
pub use jwk::{JwkValidationService, JwksFetcher, ReqwestJwksFetcher};
pub use jwt::{Claims, JwtService, TokenError};
pub use secrets::{EnvSecretStore, InMemorySecretStore, SecretError, SecretStore};
