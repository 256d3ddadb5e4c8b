use axum::{Json, Router, routing::get};

pub fn router() -> Router {
    Router::new().route("/", get(root))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Todo API",
        "status": "active",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
