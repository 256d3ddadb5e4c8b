use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{
        Claims,
        jwt::{encode_token, jwt_auth, make_access_claims},
        password::{hash_password, verify_password},
    },
    db::{
        entities::user,
        user_repo::{self, CreateUserError},
    },
    error::AppError,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: LoginUser,
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth))
        .with_state(state.clone());

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .with_state(state)
        .merge(protected)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let email = normalize_email(&body.email)?;
    let full_name = body.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::unprocessable("Full name required"));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::unprocessable(
            "Password must be at least 6 characters",
        ));
    }

    let password_hash = hash_password(&body.password)?;
    let created = user_repo::create_user(&state.db, email, full_name, &password_hash)
        .await
        .map_err(|err| match err {
            CreateUserError::DuplicateEmail => {
                AppError::new(StatusCode::BAD_REQUEST, "Email already registered")
            }
            CreateUserError::Db(_) => AppError::internal("Create user failed"),
        })?;

    tracing::info!("registered user {}", created.email);
    Ok(Json(created.into()))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Form(body): Form<LoginForm>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = user_repo::find_by_email(&state.db, body.email.trim())
        .await
        .map_err(|_| AppError::internal("DB error"))?
        .ok_or_else(|| AppError::unauthorized("Incorrect email or password"))?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::unauthorized("Incorrect email or password"));
    }

    let claims = make_access_claims(&user.id, state.access_token_ttl_secs);
    let access_token = encode_token(&state.jwt, &claims)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user: LoginUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        },
    }))
}

async fn me(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = claims.user_id()?;
    let user = user_repo::find_by_id(&state.db, &user_id)
        .await
        .map_err(|_| AppError::internal("DB error"))?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;
    Ok(Json(user.into()))
}

fn normalize_email(email: &str) -> Result<&str, AppError> {
    let trimmed = email.trim();
    let valid = trimmed.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if !valid {
        return Err(AppError::unprocessable("Invalid email address"));
    }
    Ok(trimmed)
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn accepts_plain_addresses() {
        assert_eq!(normalize_email("a@x.com").unwrap(), "a@x.com");
        assert_eq!(normalize_email("  a@x.com  ").unwrap(), "a@x.com");
    }

    #[test]
    fn rejects_structurally_invalid_addresses() {
        for bad in ["", "a", "@x.com", "a@", "a@nodot", "a@.com", "a@x.com."] {
            assert!(normalize_email(bad).is_err(), "accepted {bad:?}");
        }
    }
}
