use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use lectern_core::Credentials;
use lectern_engine::RatingOutcome;

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses/{id}/ratings", post(create_rating))
        .route("/courses/{id}/rating", get(average_rating))
}

#[derive(Deserialize)]
pub struct RatingRequest {
    #[serde(flatten)]
    credentials: Credentials,
    value: f64,
}

#[derive(Serialize)]
struct AverageResponse {
    course_id: String,
    average: f64,
}

async fn create_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RatingRequest>,
) -> Result<(StatusCode, Json<RatingOutcome>), ApiError> {
    let outcome =
        run_blocking(move || state.ratings.create_rating(&id, &req.credentials, req.value))
            .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn average_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AverageResponse>, ApiError> {
    let course_id = id.clone();
    let average = run_blocking(move || state.ratings.average_rating(&id)).await?;
    Ok(Json(AverageResponse { course_id, average }))
}
