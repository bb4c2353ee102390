use crate::auth::AuthSettings;
use crate::config::MAX_TOKEN_TTL_HOURS;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: Uuid,
    /// Unique per token, so two tokens issued within the same second still differ.
    pub jti: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Signs a new token for `user_id`.
///
/// The token expires after `settings.token_ttl_hours`, held to between one hour
/// and `MAX_TOKEN_TTL_HOURS`. Issuing a token does not
/// make it usable: the caller must also record it in the user's token list.
pub fn generate_token(user_id: Uuid, settings: &AuthSettings) -> Result<String, AppError> {
    let now = Utc::now();
    let ttl_hours = settings.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS);
    let expiration = now + Duration::hours(ttl_hours);

    let claims = Claims {
        sub: user_id,
        jti: Uuid::new_v4(),
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a token's signature and expiry and decodes its claims.
///
/// Returns `AppError::Unauthorized` if the token is malformed, its signature is
/// invalid, or it has expired. Revocation is checked separately against the store.
pub fn verify_token(token: &str, settings: &AuthSettings) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
