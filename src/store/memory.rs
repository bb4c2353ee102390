use std::cmp::Ordering;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{SortDirection, SortField, Task, TaskFilter, User};
use crate::store::Store;

#[derive(Debug, Default)]
struct Documents {
    users: Vec<User>,
    /// Kept in insertion order, which is the default listing order.
    tasks: Vec<Task>,
}

impl Documents {
    fn email_taken(&self, email: &str, except: Uuid) -> bool {
        self.users
            .iter()
            .any(|user| user.email == email && user.id != except)
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, AppError> {
        self.users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}

/// An in-process `Store`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.documents.read().await.users.len()
    }

    pub async fn task_count(&self) -> usize {
        self.documents.read().await.tasks.len()
    }
}

fn duplicate_email() -> AppError {
    AppError::BadRequest("Email is already registered".into())
}

fn compare(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        SortField::Description => a.description.cmp(&b.description),
        SortField::Completed => a.completed.cmp(&b.completed),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        if documents.email_taken(&user.email, user.id) {
            return Err(duplicate_email());
        }
        documents.users.push(user.clone());
        Ok(())
    }

    async fn update_profile(&self, user: &User) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        if documents.email_taken(&user.email, user.id) {
            return Err(duplicate_email());
        }
        let stored = documents.user_mut(user.id)?;
        stored.name = user.name.clone();
        stored.age = user.age;
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        let stored = documents.user_mut(id)?;
        stored.tokens.push(token.to_string());
        stored.touch();
        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        let stored = documents.user_mut(id)?;
        stored.tokens.retain(|active| active != token);
        stored.touch();
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        let stored = documents.user_mut(id)?;
        stored.tokens.clear();
        stored.touch();
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: &[u8]) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        let stored = documents.user_mut(id)?;
        stored.avatar = Some(avatar.to_vec());
        stored.touch();
        Ok(())
    }

    async fn clear_avatar(&self, id: Uuid) -> Result<bool, AppError> {
        let mut documents = self.documents.write().await;
        let stored = documents.user_mut(id)?;
        if stored.avatar.take().is_none() {
            return Ok(false);
        }
        stored.touch();
        Ok(true)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents
            .users
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_user_by_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents
            .users
            .iter()
            .find(|user| user.id == id && user.tokens.iter().any(|t| t == token))
            .cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut documents = self.documents.write().await;
        let before = documents.users.len();
        documents.users.retain(|user| user.id != id);
        Ok(documents.users.len() != before)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        self.documents.write().await.tasks.push(task.clone());
        Ok(())
    }

    async fn save_task(&self, task: &Task) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        match documents
            .tasks
            .iter_mut()
            .find(|stored| stored.id == task.id && stored.owner == task.owner)
        {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Task not found".into())),
        }
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents
            .tasks
            .iter()
            .find(|task| task.id == id && task.owner == owner)
            .cloned())
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        let documents = self.documents.read().await;
        let mut tasks: Vec<Task> = documents
            .tasks
            .iter()
            .filter(|task| task.owner == owner)
            .filter(|task| filter.completed.map_or(true, |c| task.completed == c))
            .cloned()
            .collect();

        if let Some((field, direction)) = filter.sort {
            tasks.sort_by(|a, b| {
                let ordering = compare(a, b, field);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let skip = filter.skip.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(tasks.into_iter().skip(skip).take(limit).collect())
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError> {
        let mut documents = self.documents.write().await;
        let position = documents
            .tasks
            .iter()
            .position(|task| task.id == id && task.owner == owner);
        Ok(position.map(|index| documents.tasks.remove(index)))
    }

    async fn delete_tasks_by_owner(&self, owner: Uuid) -> Result<u64, AppError> {
        let mut documents = self.documents.write().await;
        let before = documents.tasks.len();
        documents.tasks.retain(|task| task.owner != owner);
        Ok((before - documents.tasks.len()) as u64)
    }
}
