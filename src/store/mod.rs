//! Persistence for users and tasks.
//!
//! Route handlers and the auth middleware only see the `Store` trait. `PgStore`
//! keeps documents in PostgreSQL; `MemoryStore` keeps them in process and backs
//! the integration tests as well as `STORE=memory` runs.
//!
//! Both implementations share the same contract:
//! - `insert_user` and `update_profile` reject an email that another user already
//!   holds with `AppError::BadRequest`.
//! - user mutations touch only the fields they name, so concurrent requests on
//!   the same user (a logout racing an avatar upload) never undo each other.
//! - every task lookup is scoped by owner, so a task that exists but belongs to
//!   someone else is reported exactly like a missing one.
//! - `list_tasks` applies `TaskFilter` the same way, defaulting to creation order.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskFilter, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Writes the profile fields of `user`: name, age, email, password hash and
    /// `updated_at`. Tokens and avatar are left alone.
    async fn update_profile(&self, user: &User) -> Result<(), AppError>;

    /// Appends `token` to the user's token list.
    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), AppError>;

    /// Removes `token` from the user's token list, if present.
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), AppError>;

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AppError>;

    async fn set_avatar(&self, id: Uuid, avatar: &[u8]) -> Result<(), AppError>;

    /// Returns whether there was an avatar to remove.
    async fn clear_avatar(&self, id: Uuid) -> Result<bool, AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Finds the user only while `token` is still in their token list.
    async fn find_user_by_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError>;

    /// Returns whether a user was removed.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    async fn insert_task(&self, task: &Task) -> Result<(), AppError>;

    async fn save_task(&self, task: &Task) -> Result<(), AppError>;

    async fn find_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError>;

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, AppError>;

    /// Deletes the task and returns it, if `owner` owns it.
    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError>;

    /// Returns the number of tasks removed.
    async fn delete_tasks_by_owner(&self, owner: Uuid) -> Result<u64, AppError>;
}
