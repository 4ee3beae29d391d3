//! Bootstrap a distribution tree from existing media lines.
//!
//! Plans built line by line have spend but no percentage tree. The generator
//! groups lines by their references along the hierarchy order and derives
//! every percentage from the actual sums, so each leaf amount equals the
//! budget of the lines under it. Budget not covered by any line flows into
//! the General bucket of its branch.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::MediaLineRef;
use crate::draft::{write_draft, DistributionDraft, DraftNode, PartialFailure};
use crate::hierarchy::{BranchPath, HierarchyOrder};
use crate::money::{distribute_evenly, percentage_of, round_money};
use crate::store::{AllocationStore, StoreError};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Request / report types
// ---------------------------------------------------------------------------

/// Input for [`generate_budget_distributions_from_lines`].
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub plan_id: DbId,
    pub hierarchy_order: HierarchyOrder,
    pub lines: Vec<MediaLineRef>,
    pub total_budget: Decimal,
    /// Delete existing rows first. When false, existing rows are an error.
    pub clear_existing: bool,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    /// True when every planned row was written.
    pub success: bool,
    /// Rows actually created.
    pub count: usize,
    /// Rows the plan called for.
    pub expected: usize,
    /// Rows removed before generating.
    pub cleared: u64,
    pub failures: Vec<PartialFailure>,
    pub warnings: Vec<String>,
}

impl GenerationReport {
    /// Whether the tree came out smaller than planned and should be re-run.
    pub fn is_incomplete(&self) -> bool {
        self.count < self.expected
    }
}

/// Fatal generation errors. Per-branch failures are reported in
/// [`GenerationReport::failures`] instead.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Plan {plan_id} already has {existing} distribution rows; pass clear_existing to regenerate")]
    AlreadyGenerated { plan_id: DbId, existing: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// A branch of the tree being derived: its draft row, path, amount, and the
/// lines that fall under it.
struct Branch<'a> {
    parent: Option<usize>,
    path: BranchPath,
    amount: Decimal,
    lines: Vec<&'a MediaLineRef>,
}

/// Derive the draft tree for `lines` under `order`.
///
/// The root amount is `total_budget`. If the lines add up to more than that,
/// the line total is used instead and a warning is recorded; the audit then
/// reports the tree as over budget rather than as inconsistent.
pub fn plan_distributions_from_lines(
    order: &HierarchyOrder,
    lines: &[MediaLineRef],
    total_budget: Decimal,
) -> DistributionDraft {
    let mut draft = DistributionDraft::new(order.clone(), total_budget);

    let line_total: Decimal = lines.iter().map(|l| l.budget).sum();
    let root_amount = if line_total > total_budget {
        draft.warnings.push(format!(
            "Media line budgets ({}) exceed the plan budget ({}); using the line total",
            line_total.normalize(),
            total_budget.normalize()
        ));
        line_total
    } else {
        total_budget
    };

    let mut frontier = vec![Branch {
        parent: None,
        path: BranchPath::root(),
        amount: root_amount,
        lines: lines.iter().collect(),
    }];

    for &level in order.levels() {
        let mut next = Vec::new();
        for branch in frontier {
            let mut assigned: BTreeMap<DbId, Vec<&MediaLineRef>> = BTreeMap::new();
            let mut general: Vec<&MediaLineRef> = Vec::new();
            for &line in &branch.lines {
                match line.reference_at(level) {
                    Some(id) => assigned.entry(id).or_default().push(line),
                    None => general.push(line),
                }
            }

            let mut groups: Vec<(Option<DbId>, Decimal, Vec<&MediaLineRef>)> = assigned
                .into_iter()
                .map(|(id, group)| (Some(id), sum_budgets(&group), group))
                .collect();

            let grouped: Decimal = groups.iter().map(|(_, amount, _)| *amount).sum();
            let general_amount = branch.amount - grouped;
            if !general.is_empty() || general_amount > Decimal::ZERO || groups.is_empty() {
                groups.push((None, round_money(general_amount), general));
            }

            let even = distribute_evenly(groups.len());
            for (i, (reference_id, amount, group_lines)) in groups.into_iter().enumerate() {
                let percentage = percentage_of(amount, branch.amount).unwrap_or(even[i]);
                let path = branch.path.child(level, reference_id);
                let idx = draft.push(DraftNode {
                    path: path.clone(),
                    parent: branch.parent,
                    level,
                    reference_id,
                    percentage,
                    amount,
                    start_date: None,
                    end_date: None,
                });
                next.push(Branch {
                    parent: Some(idx),
                    path,
                    amount,
                    lines: group_lines,
                });
            }
        }
        frontier = next;
    }

    draft
}

fn sum_budgets(lines: &[&MediaLineRef]) -> Decimal {
    round_money(lines.iter().map(|l| l.budget).sum())
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Build and persist a distribution tree for a plan from its media lines.
///
/// Fails fast when rows already exist and `clear_existing` is false. Once
/// writing starts it is best effort: a failed branch is skipped and listed in
/// the report, and `count` falls short of `expected`.
pub async fn generate_budget_distributions_from_lines<S>(
    store: &S,
    request: &GenerateRequest,
) -> Result<GenerationReport, GenerateError>
where
    S: AllocationStore + ?Sized,
{
    let existing = store.fetch(request.plan_id).await?;
    let mut cleared = 0;
    if !existing.is_empty() {
        if !request.clear_existing {
            return Err(GenerateError::AlreadyGenerated {
                plan_id: request.plan_id,
                existing: existing.len(),
            });
        }
        cleared = store.delete_all(request.plan_id).await?;
    }

    let draft = plan_distributions_from_lines(
        &request.hierarchy_order,
        &request.lines,
        request.total_budget,
    );
    let outcome = write_draft(store, request.plan_id, &draft).await;

    Ok(GenerationReport {
        success: outcome.is_complete(),
        count: outcome.inserted,
        expected: outcome.expected,
        cleared,
        failures: outcome.failures,
        warnings: draft.warnings,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
