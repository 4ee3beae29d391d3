//! Handlers for a plan's budget distribution tree.

use axum::extract::{Path, State};
use axum::Json;
use mediaplan_core::allocation::BudgetAllocation;
use mediaplan_core::draft::{DistributionDraft, WriteOutcome};
use mediaplan_core::generator::{GenerateRequest, GenerationReport};
use mediaplan_core::hierarchy::BranchPath;
use mediaplan_core::reconciler::{find_orphan_lines, OrphanReport, ReferenceSets};
use mediaplan_core::types::DbId;
use mediaplan_core::wizard::WizardState;
use mediaplan_db::models::budget_distribution::BudgetDistribution;
use mediaplan_db::models::media_plan::MediaPlan;
use mediaplan_db::repositories::BudgetDistributionRepo;
use mediaplan_db::store::{generate_plan_distributions, replace_plan_distributions};
use serde::{Deserialize, Serialize};

use super::{load_line_refs, load_plan};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/plans/{id}/distributions
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<BudgetDistribution>>>> {
    load_plan(&state.pool, id).await?;
    let rows = BudgetDistributionRepo::list_by_plan(&state.pool, id).await?;
    Ok(Json(DataResponse::new(rows)))
}

// ---------------------------------------------------------------------------
// Wizard submission
// ---------------------------------------------------------------------------

/// One sibling set entered in the wizard.
#[derive(Debug, Deserialize)]
pub struct AllocationEntry {
    /// Path of the parent being split; `[]` is the plan itself.
    pub parent: BranchPath,
    pub items: Vec<BudgetAllocation>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDistributions {
    pub allocations: Vec<AllocationEntry>,
}

/// What a proposed tree would do to the plan's media lines.
#[derive(Debug, Serialize)]
pub struct DistributionPreview {
    pub rows: usize,
    pub skipped: Vec<BranchPath>,
    pub warnings: Vec<String>,
    pub orphans: OrphanReport,
}

#[derive(Debug, Serialize)]
pub struct DistributionReplacement {
    pub outcome: WriteOutcome,
    pub skipped: Vec<BranchPath>,
    pub warnings: Vec<String>,
    pub orphans: OrphanReport,
}

/// Replay the submitted sets into a wizard state for the plan and flatten it.
fn draft_for(plan: &MediaPlan, input: SubmitDistributions) -> AppResult<DistributionDraft> {
    let mut entries = input.allocations;
    // Parents before children, so a re-split never prunes a later entry.
    entries.sort_by_key(|e| e.parent.depth());

    let mut wizard = WizardState::new(plan.total_budget, plan.order()?)?;
    for entry in entries {
        wizard = wizard.apply_allocation(entry.parent, entry.items)?;
    }
    Ok(wizard.to_draft()?)
}

async fn orphans_for(
    state: &AppState,
    plan_id: DbId,
    draft: &DistributionDraft,
) -> AppResult<OrphanReport> {
    let lines = load_line_refs(&state.pool, plan_id).await?;
    let report = find_orphan_lines(&lines, &ReferenceSets::from_draft(draft));
    if !report.is_empty() {
        tracing::warn!(
            plan_id,
            count = report.count,
            line_ids = ?report.line_ids(),
            "Proposed distribution tree orphans media lines"
        );
    }
    Ok(report)
}

/// POST /api/v1/plans/{id}/distributions/preview
///
/// Validates and flattens the submission without writing anything.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitDistributions>,
) -> AppResult<Json<DataResponse<DistributionPreview>>> {
    let plan = load_plan(&state.pool, id).await?;
    let draft = draft_for(&plan, input)?;
    let orphans = orphans_for(&state, id, &draft).await?;

    Ok(Json(DataResponse::new(DistributionPreview {
        rows: draft.len(),
        skipped: draft.skipped,
        warnings: draft.warnings,
        orphans,
    })))
}

/// PUT /api/v1/plans/{id}/distributions
///
/// Replaces the whole tree. Orphaned lines are reported, not deleted; the
/// client confirms their removal through `delete-orphans`.
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitDistributions>,
) -> AppResult<Json<DataResponse<DistributionReplacement>>> {
    let plan = load_plan(&state.pool, id).await?;
    let draft = draft_for(&plan, input)?;
    let orphans = orphans_for(&state, id, &draft).await?;

    let outcome = replace_plan_distributions(&state.pool, id, &draft).await?;

    Ok(Json(DataResponse::new(DistributionReplacement {
        outcome,
        skipped: draft.skipped,
        warnings: draft.warnings,
        orphans,
    })))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GenerateDistributions {
    #[serde(default)]
    pub clear_existing: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerationResult {
    #[serde(flatten)]
    pub report: GenerationReport,
    /// The run left the tree incomplete; running again with
    /// `clear_existing` should be offered.
    pub regenerate_recommended: bool,
}

/// POST /api/v1/plans/{id}/distributions/generate
///
/// Fails with 409 when the plan already has rows and `clear_existing` is
/// false. A partially written tree still returns 200 with `success: false`.
pub async fn generate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<GenerateDistributions>,
) -> AppResult<Json<DataResponse<GenerationResult>>> {
    let plan = load_plan(&state.pool, id).await?;
    let request = GenerateRequest {
        plan_id: id,
        hierarchy_order: plan.order()?,
        lines: load_line_refs(&state.pool, id).await?,
        total_budget: plan.total_budget,
        clear_existing: input.clear_existing,
    };

    let report = generate_plan_distributions(&state.pool, &request).await?;
    let regenerate_recommended = !report.success || report.is_incomplete();

    Ok(Json(DataResponse::new(GenerationResult {
        report,
        regenerate_recommended,
    })))
}
