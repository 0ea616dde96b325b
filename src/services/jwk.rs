//! JwkValidationService - verifica di id token emessi da provider esterni
//!
//! Le chiavi pubbliche di ogni issuer (JWKS) vengono scaricate alla prima richiesta
//! e riscaricate quando la copia in cache è più vecchia di `refresh_interval`.

use crate::services::jwt::TokenError;
use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Sorgente dei JWKS di un issuer
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<JwkSet, TokenError>;
}

/// Scarica i JWKS via HTTP
#[derive(Clone, Default)]
pub struct ReqwestJwksFetcher {
    client: reqwest::Client,
}

impl ReqwestJwksFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JwksFetcher for ReqwestJwksFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, uri: &str) -> Result<JwkSet, TokenError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| TokenError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "JWKS endpoint returned an error");
            return Err(TokenError::Fetch(format!("status {}", response.status())));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| TokenError::Fetch(e.to_string()))
    }
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

pub struct JwkValidationService {
    jwks_uris: HashMap<String, String>,
    refresh_interval: Duration,
    fetcher: Arc<dyn JwksFetcher>,
    cache: DashMap<String, CachedKeys>,
}

impl JwkValidationService {
    /// # Arguments
    /// * `jwks_uris` - issuer -> URL del JWKS
    /// * `fetcher` - Client usato per scaricare i JWKS
    pub fn new(jwks_uris: HashMap<String, String>, fetcher: Arc<dyn JwksFetcher>) -> Self {
        Self {
            jwks_uris,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetcher,
            cache: DashMap::new(),
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    fn should_refresh(&self, issuer: &str) -> bool {
        self.cache
            .get(issuer)
            .is_none_or(|cached| cached.fetched_at.elapsed() >= self.refresh_interval)
    }

    async fn decoding_key(&self, kid: &str, issuer: &str) -> Result<DecodingKey, TokenError> {
        let uri = self
            .jwks_uris
            .get(issuer)
            .ok_or_else(|| TokenError::UnknownIssuer(issuer.to_string()))?;

        if self.should_refresh(issuer) {
            debug!(issuer, "Refreshing JWKS");
            let keys = self.fetcher.fetch(uri).await?;
            self.cache.insert(
                issuer.to_string(),
                CachedKeys {
                    keys,
                    fetched_at: Instant::now(),
                },
            );
        }

        let cached = self
            .cache
            .get(issuer)
            .ok_or_else(|| TokenError::Fetch(format!("no JWKS cached for '{issuer}'")))?;
        let jwk = cached
            .keys
            .find(kid)
            .ok_or_else(|| TokenError::KeyNotFound(kid.to_string()))?;

        DecodingKey::from_jwk(jwk).map_err(|e| TokenError::Unsupported(e.to_string()))
    }

    /// Verifica un id token firmato da `issuer` e destinato a `client_id`.
    ///
    /// # Returns
    /// * `Ok(claims)` - Claim del token verificato
    /// * `Err(TokenError)` - Token scaduto, non valido, o chiave non disponibile
    #[instrument(skip(self, id_token))]
    pub async fn validate_id_token(
        &self,
        id_token: &str,
        client_id: &str,
        issuer: &str,
    ) -> Result<Map<String, Value>, TokenError> {
        let header = decode_header(id_token)?;
        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("token header has no kid".to_string()))?;

        let key = self.decoding_key(&kid, issuer).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&[issuer]);

        let data = decode::<Map<String, Value>>(id_token, &key, &validation)?;
        info!("Id token validated");
        Ok(data.claims)
    }
}
