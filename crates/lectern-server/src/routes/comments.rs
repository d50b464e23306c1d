use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use lectern_core::{Comment, CourseReview, Credentials};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/classes/{id}/comments",
            post(create_comment).get(list_comments),
        )
        .route("/courses/{id}/reviews", post(create_review))
        .route("/users/{email}/reviews", get(reviews_by_user))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(flatten)]
    credentials: Credentials,
    title: String,
    body: String,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    #[serde(flatten)]
    credentials: Credentials,
    text: String,
}

async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = run_blocking(move || {
        state
            .comments
            .create_comment(&id, &req.credentials, &req.title, &req.body)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = run_blocking(move || state.comments.list_comments(&id)).await?;
    Ok(Json(comments))
}

async fn create_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<CourseReview>), ApiError> {
    let review = run_blocking(move || {
        state
            .comments
            .create_course_review(&id, &req.credentials, &req.text)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn reviews_by_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<CourseReview>>, ApiError> {
    let reviews = run_blocking(move || state.comments.reviews_by_user(&email)).await?;
    Ok(Json(reviews))
}
