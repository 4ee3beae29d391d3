//! Handlers for the dimension libraries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mediaplan_core::error::CoreError;
use mediaplan_core::hierarchy::HierarchyLevel;
use mediaplan_db::models::dimension::{CreateDimension, Dimension};
use mediaplan_db::repositories::DimensionRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/dimensions/{level}
pub async fn list(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Dimension>>>> {
    let level = HierarchyLevel::from_str_db(&level)?;
    let entries = DimensionRepo::list(&state.pool, level).await?;
    Ok(Json(DataResponse::new(entries)))
}

/// POST /api/v1/dimensions/{level}
pub async fn create(
    State(state): State<AppState>,
    Path(level): Path<String>,
    Json(input): Json<CreateDimension>,
) -> AppResult<(StatusCode, Json<DataResponse<Dimension>>)> {
    let level = HierarchyLevel::from_str_db(&level)?;
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation(format!("{level} name must not be empty")).into());
    }
    let entry = DimensionRepo::create(&state.pool, level, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(entry))))
}
