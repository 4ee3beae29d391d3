//! Top-down distribution drafts and the sequential insert that persists them.
//!
//! Both the wizard flattener and the generator produce a [`DistributionDraft`]
//! whose rows reference their parent by position in the draft. [`write_draft`]
//! turns that into stored rows level by level: parents are inserted (and get
//! ids) before any child that points at them, so a failure at depth `d`
//! leaves depths above it intact and depths below it absent, never dangling.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::NewAllocationNode;
use crate::hierarchy::{BranchPath, HierarchyLevel, HierarchyOrder};
use crate::store::{AllocationStore, StoreError};
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// One row of a draft, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftNode {
    /// Full path of this node, including its own segment.
    pub path: BranchPath,
    /// Index of the parent row in [`DistributionDraft::nodes`].
    pub parent: Option<usize>,
    pub level: HierarchyLevel,
    pub reference_id: Option<DbId>,
    pub percentage: Decimal,
    pub amount: Decimal,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl DraftNode {
    /// Depth in the hierarchy (0 = root level).
    pub fn depth(&self) -> usize {
        self.path.depth().saturating_sub(1)
    }
}

/// A complete, top-down ordered set of rows for one plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionDraft {
    pub order: HierarchyOrder,
    pub total_budget: Decimal,
    pub nodes: Vec<DraftNode>,
    /// Allocation keys that no materialized parent ever reached.
    pub skipped: Vec<BranchPath>,
    pub warnings: Vec<String>,
}

impl DistributionDraft {
    pub fn new(order: HierarchyOrder, total_budget: Decimal) -> Self {
        Self {
            order,
            total_budget,
            nodes: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Append a row and return its index.
    pub fn push(&mut self, node: DraftNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rows whose parent is `parent` (`None` = root level), in draft order.
    pub fn children_of(&self, parent: Option<usize>) -> impl Iterator<Item = (usize, &DraftNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == parent)
    }

    /// Rows at the deepest level of the order.
    pub fn leaves(&self) -> impl Iterator<Item = &DraftNode> {
        let leaf_depth = self.order.len().saturating_sub(1);
        self.nodes.iter().filter(move |n| n.depth() == leaf_depth)
    }
}

// ---------------------------------------------------------------------------
// Write outcome
// ---------------------------------------------------------------------------

/// Why a branch was not written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PartialFailureReason {
    /// The store refused the insert.
    Storage(String),
    /// The parent row was never inserted, so this row could not link to it.
    MissingParent,
}

/// A single branch that could not be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialFailure {
    pub level: HierarchyLevel,
    pub path: BranchPath,
    pub reason: PartialFailureReason,
}

/// Result of a best-effort draft write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub inserted: usize,
    pub expected: usize,
    pub failures: Vec<PartialFailure>,
}

impl WriteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.inserted == self.expected
    }

    /// Collapse into a count on success, or the failures otherwise.
    pub fn into_result(self) -> Result<usize, Vec<PartialFailure>> {
        if self.failures.is_empty() {
            Ok(self.inserted)
        } else {
            Err(self.failures)
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Persist a draft level by level, parents before children.
///
/// A failed insert skips that branch: every descendant is reported as
/// [`PartialFailureReason::MissingParent`] and siblings carry on.
pub async fn write_draft<S>(store: &S, plan_id: DbId, draft: &DistributionDraft) -> WriteOutcome
where
    S: AllocationStore + ?Sized,
{
    let mut ids: Vec<Option<DbId>> = vec![None; draft.nodes.len()];
    let mut outcome = WriteOutcome {
        expected: draft.nodes.len(),
        ..WriteOutcome::default()
    };

    let max_depth = draft.nodes.iter().map(DraftNode::depth).max();
    let Some(max_depth) = max_depth else {
        return outcome;
    };

    for depth in 0..=max_depth {
        let mut batch: Vec<usize> = Vec::new();
        let mut rows: Vec<NewAllocationNode> = Vec::new();

        for (idx, node) in draft.nodes.iter().enumerate() {
            if node.depth() != depth {
                continue;
            }
            let parent_distribution_id = match node.parent {
                None => None,
                Some(parent_idx) => match ids.get(parent_idx).copied().flatten() {
                    Some(id) => Some(id),
                    None => {
                        outcome.failures.push(PartialFailure {
                            level: node.level,
                            path: node.path.clone(),
                            reason: PartialFailureReason::MissingParent,
                        });
                        continue;
                    }
                },
            };
            batch.push(idx);
            rows.push(NewAllocationNode {
                plan_id,
                distribution_type: node.level,
                reference_id: node.reference_id,
                percentage: node.percentage,
                amount: node.amount,
                parent_distribution_id,
                start_date: node.start_date,
                end_date: node.end_date,
            });
        }

        if rows.is_empty() {
            continue;
        }

        let results = store.insert_many(&rows).await;
        for (idx, result) in batch.into_iter().zip(results) {
            match result {
                Ok(id) => {
                    ids[idx] = Some(id);
                    outcome.inserted += 1;
                }
                Err(err) => {
                    let node = &draft.nodes[idx];
                    outcome.failures.push(PartialFailure {
                        level: node.level,
                        path: node.path.clone(),
                        reason: PartialFailureReason::Storage(err.to_string()),
                    });
                }
            }
        }
    }

    outcome
}

/// Delete every row of the plan, then write the draft.
///
/// A failed delete aborts before anything is inserted.
pub async fn replace_distributions<S>(
    store: &S,
    plan_id: DbId,
    draft: &DistributionDraft,
) -> Result<WriteOutcome, StoreError>
where
    S: AllocationStore + ?Sized,
{
    store.delete_all(plan_id).await?;
    Ok(write_draft(store, plan_id, draft).await)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
