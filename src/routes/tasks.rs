use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CreateTaskRequest, Task, TaskFilter, TaskQuery, UpdateTaskRequest},
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// A malformed id can never name one of the caller's tasks, so it is reported
/// like any other missing task.
fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| task_not_found())
}

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` or `false`.
/// - `sortBy` (optional): `<field>_<asc|desc>` where field is `description`,
///   `completed`, `created_at` or `updated_at`.
/// - `limit` (optional): Maximum number of tasks to return.
/// - `skip` (optional): Number of tasks to skip.
///
/// Values that do not parse are ignored. Without `sortBy`, tasks come back in
/// creation order.
///
/// ## Responses:
/// - `200 OK`: A JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For storage errors.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    query_params: web::Query<TaskQuery>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter::from(&*query_params);
    let tasks = state.store.list_tasks(identity.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: Required, non-blank.
/// - `completed` (optional): Defaults to `false`.
///
/// Any other field, including `owner`, is ignored.
///
/// ## Responses:
/// - `201 Created`: The new `Task`.
/// - `400 Bad Request`: Missing or blank description.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<CreateTaskRequest>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let input = task_data.into_inner().normalized();
    input.validate()?;

    let task = Task::new(input, identity.user.id);
    state.store.insert_task(&task).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one of the authenticated user's tasks.
///
/// ## Responses:
/// - `200 OK`: The `Task`.
/// - `404 Not Found`: No such task, or it belongs to another user.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    let task = state
        .store
        .find_task(task_id, identity.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates one of the authenticated user's tasks.
///
/// Accepts any subset of `description` and `completed`; any other key rejects the
/// request before the task is looked up.
///
/// ## Responses:
/// - `200 OK`: The updated `Task`.
/// - `400 Bad Request`: Disallowed key or invalid value.
/// - `404 Not Found`: No such task, or it belongs to another user.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    body: web::Json<Map<String, Value>>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let update = UpdateTaskRequest::from_body(body.into_inner())?;
    update.validate()?;
    let task_id = parse_task_id(&task_id)?;

    let mut task = state
        .store
        .find_task(task_id, identity.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    task.apply(update);
    state.store.save_task(&task).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes one of the authenticated user's tasks and returns it.
///
/// ## Responses:
/// - `200 OK`: The deleted `Task`.
/// - `404 Not Found`: No such task, or it belongs to another user.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<String>,
    identity: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    let task = state
        .store
        .delete_task(task_id, identity.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}
