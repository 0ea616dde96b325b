use crate::core::{AppError, AppState};
use crate::services::jwt::Claims;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Verifica il bearer token e inserisce i [`Claims`] nelle extension della richiesta
#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Empty header is not allowed")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::forbidden("Please add the JWT token to the header"));
        }
    };

    let mut header = auth_header.split_whitespace();
    let token = match (header.next(), header.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => token.to_string(),
        _ => {
            warn!("Authorization header is not a bearer token");
            return Err(AppError::unauthorized("Unable to decode token"));
        }
    };

    let claims = state.jwt.decode_token(&token).map_err(|e| {
        warn!("Failed to decode JWT token");
        AppError::from(e)
    })?;

    info!("Subject authenticated: {}", claims.sub);
    // gli handler recuperano i claims con Extension<Claims>
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Verifica che il token contenga almeno uno degli scope richiesti
///
/// # Arguments
/// * `claims` - Claims del token già verificato
/// * `allowed_scopes` - Lista di scope permessi
///
/// # Returns
/// * `Ok(())` se uno scope è permesso
/// * `Err(AppError)` altrimenti
#[instrument(skip(claims), fields(sub = %claims.sub))]
pub fn require_scope(claims: &Claims, allowed_scopes: &[&str]) -> Result<(), AppError> {
    let scopes = claims.scopes();
    if scopes.iter().any(|s| allowed_scopes.contains(&s.as_str())) {
        debug!("Scope check passed");
        return Ok(());
    }

    warn!("Insufficient scopes {:?}, required one of: {:?}", scopes, allowed_scopes);
    Err(AppError::forbidden("Insufficient scope").with_details(format!(
        "This action requires one of the following scopes: {:?}",
        allowed_scopes
    )))
}
