use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "tailor-api",
        "time": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub connected: bool,
    pub models: Vec<String>,
    pub default_model: String,
}

/// GET /api/v1/models
///
/// Settings display only: whether the model server answers, and what it has
/// installed. An unreachable server is reported as `connected: false`, not an error.
pub async fn models_handler(State(state): State<AppState>) -> Result<Json<ModelsResponse>, AppError> {
    let default_model = state.config.default_model.clone();

    if !state.llm.check_connection().await {
        return Ok(Json(ModelsResponse {
            connected: false,
            models: Vec::new(),
            default_model,
        }));
    }

    let models = state.llm.list_models().await?;
    Ok(Json(ModelsResponse {
        connected: true,
        models,
        default_model,
    }))
}
