use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

use crate::{
    api::types::{ChatRequest, ChatResponse, StatusResponse},
    state::AppState,
};

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let completion = state
        .infer
        .generate(&req.prompt, req.mode.as_deref())
        .await
        .map_err(|err| {
            error!(%err, mode = ?req.mode, "chat generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        })?;

    info!(
        model = %completion.model,
        prompt_chars = req.prompt.chars().count(),
        response_chars = completion.response.chars().count(),
        "chat completed"
    );

    Ok(Json(ChatResponse {
        model: completion.model,
        response: completion.response,
    }))
}
