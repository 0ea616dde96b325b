//! Secrets - accesso ai segreti (chiavi di firma, credenziali)
//!
//! Il resto dell'applicazione dipende solo dal trait [`SecretStore`]; il backend
//! concreto viene scelto all'avvio.

use async_trait::async_trait;
use dashmap::DashMap;
use std::env;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;

    async fn set_secret(&self, name: &str, value: &str) -> Result<(), SecretError>;
}

/// Segreti tenuti in memoria (test e sviluppo locale)
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<String, String>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    #[instrument(skip(self))]
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        match self.secrets.get(name) {
            Some(value) => {
                debug!("Secret found");
                Ok(value.clone())
            }
            None => {
                warn!("Secret not found");
                Err(SecretError::NotFound(name.to_string()))
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn set_secret(&self, name: &str, value: &str) -> Result<(), SecretError> {
        self.secrets.insert(name.to_string(), value.to_string());
        debug!("Secret stored");
        Ok(())
    }
}

/// Segreti letti da variabili d'ambiente `SECRET_<NOME>`.
///
/// Le scritture restano in memoria nel processo e hanno la precedenza sull'ambiente.
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    overlay: InMemorySecretStore,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `jwt-signing.key` -> `SECRET_JWT_SIGNING_KEY`
    pub fn variable_name(name: &str) -> String {
        let normalized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("SECRET_{normalized}")
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    #[instrument(skip(self))]
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        if let Some(value) = self.overlay.secrets.get(name) {
            return Ok(value.clone());
        }

        env::var(Self::variable_name(name)).map_err(|_| {
            warn!("Secret not found in environment");
            SecretError::NotFound(name.to_string())
        })
    }

    async fn set_secret(&self, name: &str, value: &str) -> Result<(), SecretError> {
        self.overlay.set_secret(name, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemorySecretStore::new();
        assert_eq!(
            store.get_secret("missing").await,
            Err(SecretError::NotFound("missing".to_string()))
        );

        store.set_secret("key", "value").await.unwrap();
        assert_eq!(store.get_secret("key").await.unwrap(), "value");
    }

    #[test]
    fn test_variable_name() {
        assert_eq!(EnvSecretStore::variable_name("jwt-signing.key"), "SECRET_JWT_SIGNING_KEY");
    }

    #[tokio::test]
    async fn test_env_store_reads_environment_and_overlay() {
        unsafe { env::set_var("SECRET_SOLID_API_TEST_ENV_SECRET", "from-env") };
        let store = EnvSecretStore::new();
        assert_eq!(store.get_secret("solid_api_test_env_secret").await.unwrap(), "from-env");

        store.set_secret("solid_api_test_env_secret", "overridden").await.unwrap();
        assert_eq!(store.get_secret("solid_api_test_env_secret").await.unwrap(), "overridden");

        assert!(store.get_secret("solid_api_test_never_set").await.is_err());
    }
}
