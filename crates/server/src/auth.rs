//! Bearer-token authentication for the management API.
//!
//! Opt-in: when `AUTH_ENABLED=false` (the development default) every
//! request passes. When enabled, admin-only endpoints require a valid
//! HS256 JWT whose `role` claim is `admin`.

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use vigil_core::Config;

use crate::api::{error_response, ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

/// Require an admin bearer token (no-op when auth is disabled).
pub fn require_admin(config: &Config, headers: &HeaderMap) -> Result<(), ApiError> {
    if !config.auth.enabled {
        return Ok(());
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.auth.secret_key.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        warn!(error = %e, "JWT validation failed");
        error_response(StatusCode::UNAUTHORIZED, "Invalid authentication token")
    })?;

    if data.claims.role != "admin" {
        return Err(error_response(StatusCode::FORBIDDEN, "Admin access required"));
    }

    Ok(())
}
