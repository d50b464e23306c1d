use axum::{extract::State, routing::post, Json, Router};

use lectern_engine::MigrationReport;

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/migrate", post(migrate))
}

async fn migrate(State(state): State<AppState>) -> Result<Json<MigrationReport>, ApiError> {
    let report = run_blocking(move || state.migration.migrate_all()).await?;
    Ok(Json(report))
}
