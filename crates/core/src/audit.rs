//! Invariant audit over a plan's stored allocation rows.
//!
//! Reports every place the flat table breaks the hierarchy invariants. The
//! audit never repairs anything: any violation means the user should be
//! offered a regeneration instead.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::AllocationNode;
use crate::hierarchy::{HierarchyLevel, HierarchyOrder};
use crate::money::{share_of, validate_percentages, AMOUNT_TOLERANCE};
use crate::types::DbId;

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// Sibling percentages do not sum to 100.
    SiblingSum {
        parent_distribution_id: Option<DbId>,
        sum: Decimal,
    },
    /// Stored amount differs from `parent_amount * percentage / 100` by more than a cent.
    AmountMismatch {
        distribution_id: DbId,
        expected: Decimal,
        actual: Decimal,
    },
    /// Row type does not match the level the order expects at its depth.
    StaleType {
        distribution_id: DbId,
        depth: usize,
        expected: Option<HierarchyLevel>,
        actual: HierarchyLevel,
    },
    /// Row points at a parent that does not exist (or sits in a parent cycle).
    DanglingParent {
        distribution_id: DbId,
        parent_distribution_id: DbId,
    },
    /// Two siblings share a reference.
    DuplicateReference {
        parent_distribution_id: Option<DbId>,
        reference_id: Option<DbId>,
    },
    /// Top-level rows allocate more than the plan budget. Amounts are then
    /// checked against the allocated total instead.
    BudgetExceeded {
        total_budget: Decimal,
        allocated: Decimal,
    },
}

impl InvariantViolation {
    /// Overspend mirrors the media lines, so regenerating would rebuild it.
    pub fn is_structural(&self) -> bool {
        !matches!(self, InvariantViolation::BudgetExceeded { .. })
    }
}

/// Audit stored rows against the plan's order and total budget.
pub fn audit_distributions(
    nodes: &[AllocationNode],
    order: &HierarchyOrder,
    total_budget: Decimal,
) -> Vec<InvariantViolation> {
    let by_id: HashMap<DbId, &AllocationNode> = nodes.iter().map(|n| (n.id, n)).collect();
    let mut violations = Vec::new();
    let mut valid: Vec<&AllocationNode> = Vec::new();

    for node in nodes {
        let Some(depth) = depth_of(node, &by_id) else {
            violations.push(InvariantViolation::DanglingParent {
                distribution_id: node.id,
                parent_distribution_id: node.parent_distribution_id.unwrap_or_default(),
            });
            continue;
        };
        let expected = order.level_at(depth);
        if expected != Some(node.distribution_type) {
            violations.push(InvariantViolation::StaleType {
                distribution_id: node.id,
                depth,
                expected,
                actual: node.distribution_type,
            });
            continue;
        }
        valid.push(node);
    }

    let mut siblings: BTreeMap<Option<DbId>, Vec<&AllocationNode>> = BTreeMap::new();
    for &node in &valid {
        siblings.entry(node.parent_distribution_id).or_default().push(node);
    }

    for (parent, group) in &siblings {
        if !validate_percentages(group.iter().map(|n| n.percentage)) {
            violations.push(InvariantViolation::SiblingSum {
                parent_distribution_id: *parent,
                sum: group.iter().map(|n| n.percentage).sum(),
            });
        }
        let mut seen: Vec<Option<DbId>> = Vec::new();
        for node in group {
            if seen.contains(&node.reference_id) {
                violations.push(InvariantViolation::DuplicateReference {
                    parent_distribution_id: *parent,
                    reference_id: node.reference_id,
                });
            } else {
                seen.push(node.reference_id);
            }
        }
    }

    let allocated: Decimal = siblings
        .get(&None)
        .map(|roots| roots.iter().map(|n| n.amount).sum())
        .unwrap_or_default();
    let root_amount = if allocated > total_budget + AMOUNT_TOLERANCE {
        violations.push(InvariantViolation::BudgetExceeded {
            total_budget,
            allocated,
        });
        allocated
    } else {
        total_budget
    };

    for node in &valid {
        let parent_amount = match node.parent_distribution_id {
            None => root_amount,
            Some(parent) => match by_id.get(&parent) {
                Some(p) => p.amount,
                None => continue,
            },
        };
        let expected = share_of(parent_amount, node.percentage);
        if (expected - node.amount).abs() > AMOUNT_TOLERANCE {
            violations.push(InvariantViolation::AmountMismatch {
                distribution_id: node.id,
                expected,
                actual: node.amount,
            });
        }
    }

    violations
}

/// Whether the violations warrant prompting the user to regenerate.
pub fn needs_regeneration(violations: &[InvariantViolation]) -> bool {
    violations.iter().any(InvariantViolation::is_structural)
}

/// Depth of a row by walking parent pointers, or `None` if the chain breaks
/// or loops.
fn depth_of<'a>(
    node: &'a AllocationNode,
    by_id: &HashMap<DbId, &'a AllocationNode>,
) -> Option<usize> {
    let mut depth = 0;
    let mut current = node;
    while let Some(parent_id) = current.parent_distribution_id {
        current = *by_id.get(&parent_id)?;
        depth += 1;
        if depth > by_id.len() {
            return None;
        }
    }
    Some(depth)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
