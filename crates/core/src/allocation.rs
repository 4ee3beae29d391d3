//! Allocation rows, media line references, and wizard allocation inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::hierarchy::{BranchPath, HierarchyLevel, HierarchyOrder};
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Persisted allocation rows
// ---------------------------------------------------------------------------

/// One persisted share of a parent budget (a `budget_distributions` row).
///
/// `reference_id = None` is the General bucket of its branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationNode {
    pub id: DbId,
    pub plan_id: DbId,
    pub distribution_type: HierarchyLevel,
    pub reference_id: Option<DbId>,
    pub percentage: Decimal,
    pub amount: Decimal,
    pub parent_distribution_id: Option<DbId>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

/// Insert payload for an allocation row; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAllocationNode {
    pub plan_id: DbId,
    pub distribution_type: HierarchyLevel,
    pub reference_id: Option<DbId>,
    pub percentage: Decimal,
    pub amount: Decimal,
    pub parent_distribution_id: Option<DbId>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl NewAllocationNode {
    /// Attach a generated id, producing the stored row.
    pub fn with_id(self, id: DbId) -> AllocationNode {
        AllocationNode {
            id,
            plan_id: self.plan_id,
            distribution_type: self.distribution_type,
            reference_id: self.reference_id,
            percentage: self.percentage,
            amount: self.amount,
            parent_distribution_id: self.parent_distribution_id,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

// ---------------------------------------------------------------------------
// Media lines
// ---------------------------------------------------------------------------

/// Read-only view of a media line: the leaf spend record the tree links to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaLineRef {
    pub id: DbId,
    pub budget: Decimal,
    pub subdivision_id: Option<DbId>,
    pub moment_id: Option<DbId>,
    pub funnel_stage_id: Option<DbId>,
}

impl MediaLineRef {
    /// The line's own reference for `level`.
    pub fn reference_at(&self, level: HierarchyLevel) -> Option<DbId> {
        match level {
            HierarchyLevel::Subdivision => self.subdivision_id,
            HierarchyLevel::Moment => self.moment_id,
            HierarchyLevel::FunnelStage => self.funnel_stage_id,
        }
    }

    /// The branch this line falls into under `order`. Unassigned dimensions
    /// land in the General bucket of their level.
    pub fn path_for(&self, order: &HierarchyOrder) -> BranchPath {
        order
            .levels()
            .iter()
            .fold(BranchPath::root(), |path, level| {
                path.child(*level, self.reference_at(*level))
            })
    }

    /// Whether every segment of `path` agrees with this line's references.
    pub fn matches_path(&self, path: &BranchPath) -> bool {
        path.segments()
            .iter()
            .all(|s| self.reference_at(s.level) == s.reference_id)
    }
}

// ---------------------------------------------------------------------------
// Wizard inputs
// ---------------------------------------------------------------------------

/// A user-entered share of a parent budget at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub reference_id: Option<DbId>,
    pub percentage: Decimal,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
}

impl BudgetAllocation {
    pub fn new(reference_id: Option<DbId>, percentage: Decimal) -> Self {
        Self {
            reference_id,
            percentage,
            start_date: None,
            end_date: None,
        }
    }

    /// The General bucket covering the whole parent.
    pub fn general() -> Self {
        Self::new(None, Decimal::ONE_HUNDRED)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use HierarchyLevel::*;

    fn line(id: DbId, sub: Option<DbId>, moment: Option<DbId>) -> MediaLineRef {
        MediaLineRef {
            id,
            budget: dec!(100),
            subdivision_id: sub,
            moment_id: moment,
            funnel_stage_id: None,
        }
    }

    #[test]
    fn path_for_follows_order() {
        let order = HierarchyOrder::new(vec![Moment, Subdivision]).unwrap();
        let path = line(1, Some(7), Some(3)).path_for(&order);
        assert_eq!(path.to_string(), "moment:3/subdivision:7");
    }

    #[test]
    fn unassigned_dimension_maps_to_general() {
        let order = HierarchyOrder::new(vec![Subdivision, Moment]).unwrap();
        let path = line(1, Some(7), None).path_for(&order);
        assert_eq!(path.to_string(), "subdivision:7/moment:general");
    }

    #[test]
    fn matches_path_requires_every_segment() {
        let l = line(1, Some(7), None);
        let general_moment = BranchPath::root().child(Subdivision, Some(7)).child(Moment, None);
        let other_moment = BranchPath::root().child(Subdivision, Some(7)).child(Moment, Some(2));
        assert!(l.matches_path(&general_moment));
        assert!(!l.matches_path(&other_moment));
        assert!(l.matches_path(&BranchPath::root()));
    }

    #[test]
    fn general_allocation_covers_parent() {
        let general = BudgetAllocation::general();
        assert_eq!(general.reference_id, None);
        assert_eq!(general.percentage, dec!(100));
    }
}
