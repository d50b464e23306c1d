use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

use lectern_core::UserSummary;

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/users", post(register).get(list_users))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let user = run_blocking(move || {
        state
            .enrollment
            .register(&req.name, &req.email, &req.password)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = run_blocking(move || state.enrollment.list_users()).await?;
    Ok(Json(users))
}
