use crate::{
    auth::{
        hash_password_async, issue_token, verify_password_async, AuthMiddleware, AuthResponse,
        AuthenticatedUser, LoginRequest, LOGIN_FAILED,
    },
    avatar,
    email::{send_cancellation_email, send_welcome_email},
    error::AppError,
    models::{SignupRequest, UpdateUserRequest, User},
    state::AppState,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::info;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

/// Sign up
///
/// Validates and stores a new user, queues a welcome email, and returns the public
/// profile with a fresh token.
///
/// ## Responses:
/// - `201 Created`: `{"user": ..., "token": ...}`.
/// - `400 Bad Request`: Missing or invalid fields, or the email is already registered.
#[post("")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    let input = payload.into_inner().normalized();
    input.validate()?;

    let password_hash =
        hash_password_async(input.password.clone(), state.auth.bcrypt_cost).await?;
    let user = User::new(input, password_hash);
    state.store.insert_user(&user).await?;
    info!("Registered user {}", user.id);

    send_welcome_email(state.mailer.clone(), &user.email, &user.name);

    let token = issue_token(state.store.as_ref(), &state.auth, user.id).await?;
    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Log in
///
/// Checks the credentials and appends a new token to the user's token list.
/// Unknown email and wrong password fail identically.
///
/// ## Responses:
/// - `200 OK`: `{"user": ..., "token": ...}`.
/// - `400 Bad Request`: `{"error": "Unable to login"}`.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let email = login_data.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::BadRequest(LOGIN_FAILED.into()))?;

    let LoginRequest { password, .. } = login_data.into_inner();
    if !verify_password_async(password, user.password_hash.clone()).await? {
        return Err(AppError::BadRequest(LOGIN_FAILED.into()));
    }

    let token = issue_token(state.store.as_ref(), &state.auth, user.id).await?;
    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Log out the current session by revoking the token used for this request.
#[post("/logout", wrap = "AuthMiddleware")]
pub async fn logout(
    state: web::Data<AppState>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state
        .store
        .remove_token(identity.user.id, &identity.token)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Log out every session of the current user.
#[post("/logoutall", wrap = "AuthMiddleware")]
pub async fn logout_all(
    state: web::Data<AppState>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.store.clear_tokens(identity.user.id).await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/me", wrap = "AuthMiddleware")]
pub async fn read_profile(identity: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(identity.user)
}

/// Update profile
///
/// Accepts any subset of `name`, `age`, `email` and `password`. Any other key
/// rejects the whole request and nothing is changed. A new password is hashed
/// before it is stored.
///
/// ## Responses:
/// - `200 OK`: The updated public profile.
/// - `400 Bad Request`: Disallowed key, failed validator, or email already taken.
#[patch("/me", wrap = "AuthMiddleware")]
pub async fn update_profile(
    state: web::Data<AppState>,
    identity: AuthenticatedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update = UpdateUserRequest::from_body(body.into_inner())?;
    update.validate()?;

    let mut user = identity.user;
    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(age) = update.age {
        user.age = age;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(password) = update.password {
        user.password_hash = hash_password_async(password, state.auth.bcrypt_cost).await?;
    }
    user.touch();

    state.store.update_profile(&user).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete account
///
/// Removes the user's tasks, then the user, then queues a cancellation email.
/// The two deletions are independent; if the second fails the tasks stay deleted.
///
/// ## Responses:
/// - `200 OK`: The deleted public profile.
/// - `500 Internal Server Error`: A storage failure.
#[delete("/me", wrap = "AuthMiddleware")]
pub async fn delete_account(
    state: web::Data<AppState>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = identity.user;

    let removed_tasks = state.store.delete_tasks_by_owner(user.id).await?;
    state.store.delete_user(user.id).await?;
    info!("Deleted user {} and {} task(s)", user.id, removed_tasks);

    send_cancellation_email(state.mailer.clone(), &user.email, &user.name);
    Ok(HttpResponse::Ok().json(user))
}

/// Upload avatar
///
/// Expects a multipart body with an `avatar` file (`.jpg`, `.jpeg` or `.png`,
/// at most 1 MB). The image is stored as a 250x250 PNG.
///
/// ## Responses:
/// - `200 OK`: Empty body.
/// - `400 Bad Request`: `{"error": ...}` for a missing, oversized, misnamed or
///   undecodable file.
#[post("/me/avatar", wrap = "AuthMiddleware")]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    identity: AuthenticatedUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let upload = avatar::read_upload(payload).await?;
    let png = avatar::normalize(upload).await?;

    state.store.set_avatar(identity.user.id, &png).await?;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/me/avatar", wrap = "AuthMiddleware")]
pub async fn delete_avatar(
    state: web::Data<AppState>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    if !state.store.clear_avatar(identity.user.id).await? {
        return Err(AppError::BadRequest("No avatar to delete".into()));
    }
    Ok(HttpResponse::Ok().finish())
}

/// Serve a user's avatar as `image/png`. Public; 404 when the user or avatar is missing.
#[get("/{id}/avatar")]
pub async fn read_avatar(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let not_found = || AppError::NotFound("User or image data not found".into());

    let user_id = Uuid::parse_str(&user_id).map_err(|_| not_found())?;
    let user = state.store.find_user(user_id).await?;
    match user.and_then(|user| user.avatar) {
        Some(bytes) => Ok(HttpResponse::Ok().content_type("image/png").body(bytes)),
        None => Err(not_found()),
    }
}
