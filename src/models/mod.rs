pub mod task;
pub mod user;

use serde_json::{Map, Value};

use crate::error::AppError;

pub use task::{
    CreateTaskRequest, SortDirection, SortField, Task, TaskFilter, TaskQuery, UpdateTaskRequest,
};
pub use user::{SignupRequest, UpdateUserRequest, User};

/// Fails with 400 when `body` carries any key outside `allowed`.
pub(crate) fn ensure_allowed_fields(
    body: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), AppError> {
    match body.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(AppError::BadRequest(format!("Invalid updates: '{}'", key))),
        None => Ok(()),
    }
}
