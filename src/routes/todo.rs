use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::get,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{Claims, jwt::jwt_auth},
    db::{
        entities::{Category, Priority, todo},
        todo_repo::{self, NewTodo, TodoFilter, TodoPatch, TodoStats},
    },
    error::AppError,
    state::AppState,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    pub due_date: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Deserialize)]
pub struct ListTodosParams {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub search: Option<String>,
}

fn default_limit() -> u64 {
    100
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub category: Category,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub owner_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/stats/summary", get(todo_stats))
        .route(
            "/todos/{todo_id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth))
        .with_state(state)
}

async fn list_todos(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Query(params): Query<ListTodosParams>,
) -> Result<Json<Vec<TodoResponse>>, AppError> {
    let owner_id = claims.user_id()?;
    let filter = TodoFilter {
        category: params.category,
        priority: params.priority,
        completed: params.completed,
        search: params.search,
    };
    let todos = todo_repo::list_todos(&state.db, &owner_id, params.skip, params.limit, &filter)
        .await
        .map_err(|_| AppError::internal("Todo fetch failed"))?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

async fn create_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(body): Json<CreateTodoRequest>,
) -> Result<Json<TodoResponse>, AppError> {
    let owner_id = claims.user_id()?;
    let title = normalize_title(&body.title)?;
    let description = validate_description(body.description)?;

    let created = todo_repo::create_todo(
        &state.db,
        &owner_id,
        NewTodo {
            title,
            description,
            priority: body.priority,
            category: body.category,
            due_date: body.due_date,
        },
    )
    .await
    .map_err(|_| AppError::internal("Create todo failed"))?;
    Ok(Json(created.into()))
}

async fn get_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(todo_id): Path<Uuid>,
) -> Result<Json<TodoResponse>, AppError> {
    let owner_id = claims.user_id()?;
    let found = todo_repo::find_by_id(&state.db, &todo_id, &owner_id)
        .await
        .map_err(|_| AppError::internal("Todo fetch failed"))?
        .ok_or_else(|| AppError::not_found("Todo not found"))?;
    Ok(Json(found.into()))
}

async fn update_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(todo_id): Path<Uuid>,
    Json(body): Json<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, AppError> {
    let owner_id = claims.user_id()?;
    let title = match body.title {
        Some(value) => Some(normalize_title(&value)?),
        None => None,
    };
    let description = validate_description(body.description)?;

    let patch = TodoPatch {
        title,
        description,
        completed: body.completed,
        priority: body.priority,
        category: body.category,
        due_date: body.due_date,
    };
    let updated = todo_repo::update_todo(&state.db, &todo_id, &owner_id, patch)
        .await
        .map_err(|_| AppError::internal("Update todo failed"))?
        .ok_or_else(|| AppError::not_found("Todo not found"))?;
    Ok(Json(updated.into()))
}

async fn delete_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(todo_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let owner_id = claims.user_id()?;
    let deleted = todo_repo::delete_todo(&state.db, &todo_id, &owner_id)
        .await
        .map_err(|_| AppError::internal("Delete todo failed"))?;
    if !deleted {
        return Err(AppError::not_found("Todo not found"));
    }
    Ok(Json(DeleteResponse {
        message: "Todo deleted successfully",
    }))
}

async fn todo_stats(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Json<TodoStats>, AppError> {
    let owner_id = claims.user_id()?;
    let stats = todo_repo::stats(&state.db, &owner_id)
        .await
        .map_err(|_| AppError::internal("Stats fetch failed"))?;
    Ok(Json(stats))
}

fn normalize_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::unprocessable("Title must be 1-200 characters"));
    }
    Ok(trimmed.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>, AppError> {
    match description {
        Some(value) if value.chars().count() > MAX_DESCRIPTION_LEN => Err(
            AppError::unprocessable("Description must be at most 1000 characters"),
        ),
        other => Ok(other),
    }
}

impl From<todo::Model> for TodoResponse {
    fn from(model: todo::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            completed: model.completed,
            priority: Priority::try_from(model.priority.as_str()).unwrap_or_default(),
            category: Category::try_from(model.category.as_str()).unwrap_or_default(),
            due_date: model.due_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
            completed_at: model.completed_at,
            owner_id: model.owner_id,
        }
    }
}
