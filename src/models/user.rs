use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::ensure_allowed_fields;

/// Fields a client may change through `PATCH /users/me`.
pub const USER_UPDATABLE_FIELDS: &[&str] = &["name", "age", "email", "password"];

/// A registered account as held by the store.
///
/// Serializing a `User` yields its public profile: the password hash, the issued
/// tokens and the avatar bytes are never written out.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Every token issued to this user that has not been revoked.
    #[serde(skip_serializing)]
    pub tokens: Vec<String>,
    #[serde(skip_serializing)]
    pub avatar: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a user from already validated signup data and a password hash.
    pub fn new(input: SignupRequest, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            age: input.age,
            email: input.email,
            password_hash,
            tokens: Vec::new(),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("password_phrase");
        error.message = Some("Password may not contain the phrase 'password'".into());
        return Err(error);
    }
    Ok(())
}

/// Payload for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be a nonnegative number"))]
    pub age: i32,
    #[validate(email(message = "Invalid email address provided"))]
    pub email: String,
    #[validate(
        length(min = 7, message = "Password must contain at least 7 characters"),
        custom = "validate_password"
    )]
    pub password: String,
}

impl SignupRequest {
    /// Applies the trim and lowercase rules that run before validation.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.trim().to_string();
        self
    }
}

/// Payload for `PATCH /users/me`; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Age must be a nonnegative number"))]
    pub age: Option<i32>,
    #[validate(email(message = "Invalid email address provided"))]
    pub email: Option<String>,
    #[validate(
        length(min = 7, message = "Password must contain at least 7 characters"),
        custom = "validate_password"
    )]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    /// Rejects bodies carrying fields outside the allow-list, then decodes and
    /// normalizes the rest.
    pub fn from_body(body: Map<String, Value>) -> Result<Self, AppError> {
        ensure_allowed_fields(&body, USER_UPDATABLE_FIELDS)?;
        let update: Self = serde_json::from_value(Value::Object(body))
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(Self {
            name: update.name.map(|name| name.trim().to_string()),
            age: update.age,
            email: update.email.map(|email| email.trim().to_lowercase()),
            password: update.password.map(|password| password.trim().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            age: 0,
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup("Bob", "bob@example.com", "burgerOfTheDay")
            .validate()
            .is_ok());

        assert!(signup("Bob", "bob-at-example.com", "burgerOfTheDay")
            .validate()
            .is_err());

        assert!(signup("Bob", "bob@example.com", "short").validate().is_err());

        assert!(signup("Bob", "bob@example.com", "MyPassWord123")
            .validate()
            .is_err());

        assert!(signup("   ", "bob@example.com", "burgerOfTheDay")
            .normalized()
            .validate()
            .is_err());

        let mut negative_age = signup("Bob", "bob@example.com", "burgerOfTheDay");
        negative_age.age = -1;
        assert!(negative_age.validate().is_err());
    }

    #[test]
    fn test_signup_normalization() {
        let input = signup("  Bob Belcher  ", "  Bob@BobsBurgers.COM ", " burgerOfTheDay ")
            .normalized();
        assert_eq!(input.name, "Bob Belcher");
        assert_eq!(input.email, "bob@bobsburgers.com");
        assert_eq!(input.password, "burgerOfTheDay");
    }

    #[test]
    fn test_public_profile_hides_secrets() {
        let mut user = User::new(
            signup("Bob", "bob@example.com", "burgerOfTheDay"),
            "$2b$04$hash".to_string(),
        );
        user.tokens.push("token".to_string());
        user.avatar = Some(vec![1, 2, 3]);

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["name"], "Bob");
        assert_eq!(value["age"], 0);
        assert!(value.get("password_hash").is_none());
        assert!(value.get("password").is_none());
        assert!(value.get("tokens").is_none());
        assert!(value.get("avatar").is_none());
    }

    #[test]
    fn test_update_allow_list() {
        let body = json!({ "location": "Philadelphia" });
        let result = UpdateUserRequest::from_body(body.as_object().unwrap().clone());
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let body = json!({ "name": "  Jess ", "email": "JESS@example.com" });
        let update = UpdateUserRequest::from_body(body.as_object().unwrap().clone()).unwrap();
        assert_eq!(update.name.as_deref(), Some("Jess"));
        assert_eq!(update.email.as_deref(), Some("jess@example.com"));
        assert!(update.age.is_none());
        assert!(update.validate().is_ok());

        let body = json!({ "password": "password1" });
        let update = UpdateUserRequest::from_body(body.as_object().unwrap().clone()).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_update_rejects_wrong_types() {
        let body = json!({ "age": "old" });
        let result = UpdateUserRequest::from_body(body.as_object().unwrap().clone());
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
