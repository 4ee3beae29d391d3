//! HTTP handlers, one module per resource.

pub mod dimensions;
pub mod distributions;
pub mod media_lines;
pub mod plans;

use mediaplan_core::allocation::{AllocationNode, MediaLineRef};
use mediaplan_core::error::CoreError;
use mediaplan_core::types::DbId;
use mediaplan_db::models::budget_distribution::into_nodes;
use mediaplan_db::models::media_plan::MediaPlan;
use mediaplan_db::repositories::{BudgetDistributionRepo, MediaLineRepo, MediaPlanRepo};
use mediaplan_db::DbPool;

use crate::error::{AppError, AppResult};

/// Fetch a plan or fail with 404.
pub(crate) async fn load_plan(pool: &DbPool, id: DbId) -> AppResult<MediaPlan> {
    MediaPlanRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaPlan",
            id,
        }))
}

/// Stored distribution rows of a plan as engine nodes.
pub(crate) async fn load_nodes(pool: &DbPool, plan_id: DbId) -> AppResult<Vec<AllocationNode>> {
    let rows = BudgetDistributionRepo::list_by_plan(pool, plan_id).await?;
    Ok(into_nodes(rows)?)
}

pub(crate) async fn load_line_refs(pool: &DbPool, plan_id: DbId) -> AppResult<Vec<MediaLineRef>> {
    let lines = MediaLineRepo::list_by_plan(pool, plan_id).await?;
    Ok(lines.iter().map(|l| l.to_ref()).collect())
}
