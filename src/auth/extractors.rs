use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::AUTH_FAILED;
use crate::error::AppError;
use crate::models::User;

/// The caller resolved by `AuthMiddleware`: their user document and the exact
/// token they presented.
///
/// Handlers on routes wrapped by `AuthMiddleware` take this as an argument. If it
/// is missing from the request extensions, the extractor fails with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(identity) => ready(Ok(identity)),
            None => ready(Err(AppError::Unauthorized(AUTH_FAILED.to_string()).into())),
        }
    }
}
