use std::{sync::Arc, time::Duration};

use axum::Router;
use sea_orm::{ConnectOptions, Database};

use crate::{config::AppConfig, routes::router, state::AppState};

/// App state over a fresh in-memory sqlite database with the schema synced.
/// A single pooled connection keeps every request on the same database.
pub async fn test_state(secret: &[u8]) -> Arc<AppState> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    let db = Database::connect(opt).await.expect("connect in-memory sqlite");
    db.get_schema_registry("todo_server::db::entities::*")
        .sync(&db)
        .await
        .expect("sync schema");

    let cfg = AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        db_min_idle: 1,
        jwt_secret: String::from_utf8_lossy(secret).into_owned(),
        access_token_ttl_mins: 30,
        log_level: "info".to_string(),
    };
    AppState::new(&cfg, db)
}

pub async fn test_router(secret: &[u8]) -> Router {
    let state = test_state(secret).await;
    router(state)
}
