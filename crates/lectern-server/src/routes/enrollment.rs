use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

use lectern_core::{Course, CourseProgress, Credentials, Enrollment};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/enrollments", post(enroll))
        .route("/me/courses", post(enrolled_courses))
        .route("/me/progress", post(progress))
        .route("/me/views", post(mark_class_viewed))
}

#[derive(Deserialize)]
pub struct EnrollRequest {
    #[serde(flatten)]
    credentials: Credentials,
    course_id: String,
}

#[derive(Deserialize)]
pub struct ViewRequest {
    #[serde(flatten)]
    credentials: Credentials,
    class_id: String,
}

async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<Enrollment>), ApiError> {
    let enrollment =
        run_blocking(move || state.enrollment.enroll(&req.credentials, &req.course_id)).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn enrolled_courses(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = run_blocking(move || state.enrollment.enrolled_courses(&credentials)).await?;
    Ok(Json(courses))
}

async fn progress(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Vec<CourseProgress>>, ApiError> {
    let progress = run_blocking(move || state.enrollment.progress(&credentials)).await?;
    Ok(Json(progress))
}

async fn mark_class_viewed(
    State(state): State<AppState>,
    Json(req): Json<ViewRequest>,
) -> Result<Json<CourseProgress>, ApiError> {
    let progress = run_blocking(move || {
        state
            .enrollment
            .mark_class_viewed(&req.credentials, &req.class_id)
    })
    .await?;
    Ok(Json(progress))
}
