//! JwtService - emissione e verifica dei token firmati dall'applicazione

use crate::core::config::TokenServiceSettings;
use crate::services::secrets::{SecretError, SecretStore};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("no public key matching kid '{0}'")]
    KeyNotFound(String),

    #[error("unsupported key or algorithm: {0}")]
    Unsupported(String),

    #[error("unknown issuer '{0}'")]
    UnknownIssuer(String),

    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

// struct che codifica il contenuto del token jwt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    pub jti: String,
    /// Claim aggiuntivi (scope per gli access token, info utente per gli id token)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn scopes(&self) -> Vec<String> {
        match self.extra.get("scope") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

pub struct JwtService {
    settings: TokenServiceSettings,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtService {
    /// Crea il servizio con una chiave simmetrica
    pub fn new(settings: TokenServiceSettings, secret: &str) -> Result<Self, TokenError> {
        if !is_hmac(settings.algorithm) {
            return Err(TokenError::Unsupported(format!(
                "{:?} requires an asymmetric key",
                settings.algorithm
            )));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            settings,
        })
    }

    /// Legge la chiave di firma dal secret store (nome da `settings.secret_name`)
    pub async fn from_secret_store(
        settings: TokenServiceSettings,
        store: &dyn SecretStore,
    ) -> Result<Self, TokenError> {
        let secret = store.get_secret(&settings.secret_name).await?;
        Self::new(settings, &secret)
    }

    pub fn settings(&self) -> &TokenServiceSettings {
        &self.settings
    }

    fn create_token(
        &self,
        user_id: &str,
        audience: &str,
        expiry_minutes: i64,
        extra: Map<String, Value>,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            iss: self.settings.issuer.clone(),
            sub: user_id.to_string(),
            aud: audience.to_string(),
            exp: (now + Duration::minutes(expiry_minutes)).timestamp(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            extra,
        };

        encode(&Header::new(self.settings.algorithm), &claims, &self.encoding).map_err(|e| {
            error!("Failed to encode JWT token: {:?}", e);
            TokenError::Signing(e.to_string())
        })
    }

    #[instrument(skip(self, scopes), fields(user_id = %user_id))]
    pub fn create_access_token(&self, user_id: &str, scopes: &[String]) -> Result<String, TokenError> {
        debug!("Encoding access token");
        let mut extra = Map::new();
        extra.insert("scope".to_string(), Value::from(scopes.to_vec()));
        let token = self.create_token(
            user_id,
            &self.settings.access_token_audience,
            self.settings.access_token_expiry_minutes,
            extra,
        )?;
        info!("Access token encoded successfully");
        Ok(token)
    }

    #[instrument(skip(self, user_info), fields(user_id = %user_id))]
    pub fn create_id_token(&self, user_id: &str, user_info: Map<String, Value>) -> Result<String, TokenError> {
        debug!("Encoding id token");
        let token = self.create_token(
            user_id,
            &self.settings.id_token_audience,
            self.settings.id_token_expiry_minutes,
            user_info,
        )?;
        info!("Id token encoded successfully");
        Ok(token)
    }

    /// Verifica firma, scadenza, issuer e audience (access o id token)
    #[instrument(skip(self, token))]
    pub fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        debug!("Decoding JWT token");
        let mut validation = Validation::new(self.settings.algorithm);
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[
            &self.settings.access_token_audience,
            &self.settings.id_token_audience,
        ]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| {
                info!("JWT token decoded successfully for subject: {}", data.claims.sub);
                data.claims
            })
            .map_err(|e| {
                warn!("Failed to decode JWT token: {:?}", e);
                TokenError::from(e)
            })
    }
}
