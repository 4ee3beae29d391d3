//! Handlers for the `/plans` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mediaplan_core::audit::{audit_distributions, needs_regeneration, InvariantViolation};
use mediaplan_core::error::CoreError;
use mediaplan_core::hierarchy::HierarchyOrder;
use mediaplan_core::tree::{build_hierarchy_tree, HierarchyTree};
use mediaplan_core::types::{Date, DbId};
use mediaplan_db::models::media_plan::{CreateMediaPlan, MediaPlan, UpdateMediaPlan};
use mediaplan_db::names::NameDirectory;
use mediaplan_db::repositories::MediaPlanRepo;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{load_line_refs, load_nodes, load_plan};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/plans
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateMediaPlan>,
) -> AppResult<(StatusCode, Json<DataResponse<MediaPlan>>)> {
    validate_name(&input.name)?;
    validate_budget(input.total_budget)?;
    validate_dates(input.start_date, input.end_date)?;

    let plan = MediaPlanRepo::create(&state.pool, &input).await?;
    tracing::info!(plan_id = plan.id, order = %input.hierarchy_order, "Media plan created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(plan))))
}

/// GET /api/v1/plans
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<MediaPlan>>>> {
    let plans = MediaPlanRepo::list(&state.pool).await?;
    Ok(Json(DataResponse::new(plans)))
}

/// GET /api/v1/plans/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MediaPlan>>> {
    let plan = load_plan(&state.pool, id).await?;
    Ok(Json(DataResponse::new(plan)))
}

/// PUT /api/v1/plans/{id}
///
/// Changing the total budget does not rescale stored distribution amounts;
/// the hierarchy read reports the mismatch and recommends regeneration.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMediaPlan>,
) -> AppResult<Json<DataResponse<MediaPlan>>> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    if let Some(budget) = input.total_budget {
        validate_budget(budget)?;
    }
    let current = load_plan(&state.pool, id).await?;
    validate_dates(
        input.start_date.or(current.start_date),
        input.end_date.or(current.end_date),
    )?;

    let plan = MediaPlanRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaPlan",
            id,
        }))?;
    Ok(Json(DataResponse::new(plan)))
}

/// DELETE /api/v1/plans/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if MediaPlanRepo::delete(&state.pool, id).await? {
        tracing::info!(plan_id = id, "Media plan deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "MediaPlan",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateHierarchyOrder {
    pub hierarchy_order: HierarchyOrder,
}

/// The plan after an order change, plus how well its stored rows fit the
/// new order.
#[derive(Debug, Serialize)]
pub struct HierarchyOrderChange {
    pub plan: MediaPlan,
    pub violations: Vec<InvariantViolation>,
    pub regenerate_recommended: bool,
}

/// PUT /api/v1/plans/{id}/hierarchy-order
///
/// Stored rows are kept. Rows whose type no longer matches their depth show
/// up as violations; the client decides whether to regenerate.
pub async fn update_hierarchy_order(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateHierarchyOrder>,
) -> AppResult<Json<DataResponse<HierarchyOrderChange>>> {
    let plan = MediaPlanRepo::update_hierarchy_order(&state.pool, id, &input.hierarchy_order)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaPlan",
            id,
        }))?;

    let nodes = load_nodes(&state.pool, id).await?;
    let violations = audit_distributions(&nodes, &input.hierarchy_order, plan.total_budget);
    let regenerate_recommended = needs_regeneration(&violations);
    if regenerate_recommended {
        tracing::warn!(
            plan_id = id,
            order = %input.hierarchy_order,
            violations = violations.len(),
            "Stored distributions do not fit the new hierarchy order"
        );
    }

    Ok(Json(DataResponse::new(HierarchyOrderChange {
        plan,
        violations,
        regenerate_recommended,
    })))
}

#[derive(Debug, Serialize)]
pub struct HierarchyView {
    pub plan_id: DbId,
    pub hierarchy_order: HierarchyOrder,
    pub total_budget: Decimal,
    pub tree: HierarchyTree,
    pub violations: Vec<InvariantViolation>,
    /// True when the plan has lines but no stored tree, or the stored tree
    /// breaks an invariant.
    pub regenerate_recommended: bool,
}

/// GET /api/v1/plans/{id}/hierarchy
pub async fn get_hierarchy(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<HierarchyView>>> {
    let plan = load_plan(&state.pool, id).await?;
    let order = plan.order()?;
    let nodes = load_nodes(&state.pool, id).await?;
    let lines = load_line_refs(&state.pool, id).await?;
    let names = NameDirectory::load(&state.pool, order.levels()).await?;

    let tree = build_hierarchy_tree(&nodes, &lines, &order, plan.total_budget, |level, ref_id| {
        names.resolve(level, ref_id)
    });
    for warning in &tree.warnings {
        tracing::warn!(plan_id = id, warning = %warning, "Hierarchy read warning");
    }

    let violations = audit_distributions(&nodes, &order, plan.total_budget);
    let ungenerated = nodes.is_empty() && !order.is_empty() && !lines.is_empty();
    let regenerate_recommended = ungenerated || needs_regeneration(&violations);

    Ok(Json(DataResponse::new(HierarchyView {
        plan_id: plan.id,
        hierarchy_order: order,
        total_budget: plan.total_budget,
        tree,
        violations,
        regenerate_recommended,
    })))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Plan name must not be empty".into()));
    }
    Ok(())
}

fn validate_budget(budget: Decimal) -> Result<(), CoreError> {
    if budget.is_sign_negative() {
        return Err(CoreError::Validation(format!(
            "Total budget must not be negative, got {budget}"
        )));
    }
    Ok(())
}

fn validate_dates(start: Option<Date>, end: Option<Date>) -> Result<(), CoreError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(CoreError::Validation(format!(
                "Plan end date {end} is before start date {start}"
            )));
        }
    }
    Ok(())
}
