//! Handlers for media lines.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mediaplan_core::error::CoreError;
use mediaplan_core::reconciler::{find_orphan_lines, OrphanLine, ReferenceSets};
use mediaplan_core::types::DbId;
use mediaplan_db::models::media_line::{CreateMediaLine, MediaLine, UpdateMediaLine};
use mediaplan_db::repositories::MediaLineRepo;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{load_line_refs, load_nodes, load_plan};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/plans/{id}/media-lines
pub async fn list_by_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<MediaLine>>>> {
    load_plan(&state.pool, plan_id).await?;
    let lines = MediaLineRepo::list_by_plan(&state.pool, plan_id).await?;
    Ok(Json(DataResponse::new(lines)))
}

/// POST /api/v1/plans/{id}/media-lines
pub async fn create(
    State(state): State<AppState>,
    Path(plan_id): Path<DbId>,
    Json(input): Json<CreateMediaLine>,
) -> AppResult<(StatusCode, Json<DataResponse<MediaLine>>)> {
    load_plan(&state.pool, plan_id).await?;
    validate_line(Some(&input.name), Some(input.budget))?;
    let line = MediaLineRepo::create(&state.pool, plan_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(line))))
}

/// PUT /api/v1/media-lines/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMediaLine>,
) -> AppResult<Json<DataResponse<MediaLine>>> {
    validate_line(input.name.as_deref(), input.budget)?;
    let line = MediaLineRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaLine",
            id,
        }))?;
    Ok(Json(DataResponse::new(line)))
}

/// DELETE /api/v1/media-lines/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if MediaLineRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "MediaLine",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Orphan deletion
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DeleteOrphans {
    /// Lines the user confirmed for deletion.
    pub line_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct DeletedOrphans {
    pub deleted: u64,
    pub lines: Vec<OrphanLine>,
}

/// POST /api/v1/plans/{id}/media-lines/delete-orphans
///
/// Orphans are recomputed against the stored tree and only confirmed ids
/// that are still orphaned are removed. A plan without stored rows has no
/// tree to orphan against, so nothing is deleted.
pub async fn delete_orphans(
    State(state): State<AppState>,
    Path(plan_id): Path<DbId>,
    Json(input): Json<DeleteOrphans>,
) -> AppResult<Json<DataResponse<DeletedOrphans>>> {
    if input.line_ids.is_empty() {
        return Err(AppError::BadRequest(
            "line_ids must list the orphaned lines confirmed for deletion".into(),
        ));
    }
    let plan = load_plan(&state.pool, plan_id).await?;
    let order = plan.order()?;
    let nodes = load_nodes(&state.pool, plan_id).await?;
    let sets = if nodes.is_empty() {
        ReferenceSets::default()
    } else {
        ReferenceSets::from_nodes(&order, &nodes)
    };

    let lines = load_line_refs(&state.pool, plan_id).await?;
    let report = find_orphan_lines(&lines, &sets);
    let confirmed: Vec<OrphanLine> = report
        .lines
        .into_iter()
        .filter(|l| input.line_ids.contains(&l.id))
        .collect();
    let ids: Vec<DbId> = confirmed.iter().map(|l| l.id).collect();

    let deleted = if ids.is_empty() {
        0
    } else {
        MediaLineRepo::delete_many_in_plan(&state.pool, plan_id, &ids).await?
    };
    tracing::info!(
        plan_id,
        requested = input.line_ids.len(),
        deleted,
        "Orphaned media lines deleted"
    );

    Ok(Json(DataResponse::new(DeletedOrphans {
        deleted,
        lines: confirmed,
    })))
}

fn validate_line(name: Option<&str>, budget: Option<Decimal>) -> Result<(), CoreError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::Validation("Media line name must not be empty".into()));
    }
    if let Some(budget) = budget {
        if budget.is_sign_negative() {
            return Err(CoreError::Validation(format!(
                "Media line budget must not be negative, got {budget}"
            )));
        }
    }
    Ok(())
}
