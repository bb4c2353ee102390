use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::ensure_allowed_fields;

/// Fields a client may change through `PATCH /tasks/{id}`.
pub const TASK_UPDATABLE_FIELDS: &[&str] = &["description", "completed"];

/// A to-do item. Every task belongs to exactly one user, its `owner`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task for `owner`. The owner never comes from the request body.
    pub fn new(input: CreateTaskRequest, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateTaskRequest) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
    }
}

/// Payload for `POST /tasks`. Unknown fields, including `owner`, are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl CreateTaskRequest {
    pub fn normalized(mut self) -> Self {
        self.description = self.description.trim().to_string();
        self
    }
}

/// Payload for `PATCH /tasks/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTaskRequest {
    pub fn from_body(body: Map<String, Value>) -> Result<Self, AppError> {
        ensure_allowed_fields(&body, TASK_UPDATABLE_FIELDS)?;
        let update: Self = serde_json::from_value(Value::Object(body))
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(Self {
            description: update.description.map(|d| d.trim().to_string()),
            completed: update.completed,
        })
    }
}

/// Raw query string of `GET /tasks`.
///
/// Every value is kept as text so that an unparsable parameter is ignored
/// instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub completed: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "description" => Some(Self::Description),
            "completed" => Some(Self::Completed),
            "created_at" | "createdAt" => Some(Self::CreatedAt),
            "updated_at" | "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Completed => "completed",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// The sanitized form of `TaskQuery` that stores execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub sort: Option<(SortField, SortDirection)>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl From<&TaskQuery> for TaskFilter {
    fn from(query: &TaskQuery) -> Self {
        let completed = match query.completed.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };

        // Split at the last underscore so `created_at_desc` keeps its field name.
        let sort = query
            .sort_by
            .as_deref()
            .and_then(|raw| raw.rsplit_once('_'))
            .and_then(|(field, direction)| {
                let direction = match direction {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    _ => return None,
                };
                SortField::parse(field).map(|field| (field, direction))
            });

        let limit = query
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0);
        let skip = query
            .skip
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|skip| *skip > 0);

        Self {
            completed,
            sort,
            limit,
            skip,
        }
    }
}
