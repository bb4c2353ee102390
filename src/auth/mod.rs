pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::store::Store;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
pub use token::{generate_token, verify_token, Claims};

/// The only message a client ever sees when authentication fails.
pub const AUTH_FAILED: &str = "Please authenticate.";

/// The only message a client ever sees when a login is refused.
pub const LOGIN_FAILED: &str = "Unable to login";

/// Secrets and cost factors for issuing and checking credentials.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl From<&Config> for AuthSettings {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

/// Represents the payload for a user login request.
///
/// No format validation happens here: a malformed email simply fails to match an
/// account, which keeps every login failure identical.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body of signup and login: the public profile plus the new token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Signs a new token for `user_id` and appends it to the stored token list.
pub async fn issue_token(
    store: &dyn Store,
    settings: &AuthSettings,
    user_id: Uuid,
) -> Result<String, AppError> {
    let token = generate_token(user_id, settings)?;
    store.push_token(user_id, &token).await?;
    Ok(token)
}
