//! Wizard state as an immutable value.
//!
//! Every transition consumes the state and returns a new one, so callers can
//! keep the previous step around (back button) and never observe a half
//! applied change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::BudgetAllocation;
use crate::draft::DistributionDraft;
use crate::error::CoreError;
use crate::flatten::{flatten_allocations, validate_allocation_set, AllocationMap};
use crate::hierarchy::{BranchPath, HierarchyOrder};
use crate::reconciler::ReferenceSets;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub total_budget: Decimal,
    pub order: HierarchyOrder,
    #[serde(default, with = "allocation_entries")]
    pub allocations: AllocationMap,
}

impl WizardState {
    pub fn new(total_budget: Decimal, order: HierarchyOrder) -> Result<Self, CoreError> {
        Self {
            total_budget: Decimal::ZERO,
            order,
            allocations: AllocationMap::new(),
        }
        .set_total_budget(total_budget)
    }

    pub fn set_total_budget(self, total_budget: Decimal) -> Result<Self, CoreError> {
        if total_budget.is_sign_negative() {
            return Err(CoreError::Validation(format!(
                "Total budget must not be negative, got {total_budget}"
            )));
        }
        Ok(Self {
            total_budget,
            ..self
        })
    }

    /// Changing the order invalidates every path, so allocations are dropped.
    pub fn set_hierarchy_order(self, order: HierarchyOrder) -> Self {
        if order == self.order {
            return self;
        }
        Self {
            total_budget: self.total_budget,
            order,
            allocations: AllocationMap::new(),
        }
    }

    /// Set the split of `parent`'s children, replacing any previous split.
    ///
    /// Splits below `parent` are kept only while their branch still exists.
    pub fn apply_allocation(
        mut self,
        parent: BranchPath,
        items: Vec<BudgetAllocation>,
    ) -> Result<Self, CoreError> {
        validate_allocation_set(&self.order, &parent, &items)?;

        let kept: Vec<_> = items.iter().map(|i| i.reference_id).collect();
        let child_depth = parent.depth() + 1;
        self.allocations.retain(|key, _| {
            if key.depth() < child_depth || !parent.is_prefix_of(key) {
                return true;
            }
            let reference = key.segments()[parent.depth()].reference_id;
            // An empty split stands for a single General child.
            if kept.is_empty() {
                reference.is_none()
            } else {
                kept.contains(&reference)
            }
        });
        self.allocations.insert(parent, items);
        Ok(self)
    }

    /// Remove the split of `parent` and every split beneath it.
    pub fn clear_allocation(mut self, parent: &BranchPath) -> Self {
        self.allocations.retain(|key, _| !parent.is_prefix_of(key));
        self
    }

    /// Check every split entered for parents at `depth`.
    pub fn validate_depth(&self, depth: usize) -> Result<(), CoreError> {
        if depth >= self.order.len() {
            return Err(CoreError::Validation(format!(
                "Step {depth} is beyond hierarchy order {}",
                self.order
            )));
        }
        self.allocations
            .iter()
            .filter(|(key, _)| key.depth() == depth)
            .try_for_each(|(key, items)| validate_allocation_set(&self.order, key, items))
    }

    /// Whether the wizard may move past the step that splits `depth`.
    pub fn can_advance(&self, depth: usize) -> bool {
        self.validate_depth(depth).is_ok()
    }

    pub fn to_draft(&self) -> Result<DistributionDraft, CoreError> {
        flatten_allocations(&self.order, self.total_budget, &self.allocations)
    }

    /// References of the tree this state would produce, for orphan previews.
    pub fn reference_sets(&self) -> Result<ReferenceSets, CoreError> {
        self.to_draft().map(|draft| ReferenceSets::from_draft(&draft))
    }
}

/// `BranchPath` keys serialize as JSON arrays, so the map travels as a list
/// of `{ parent, items }` entries.
mod allocation_entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::allocation::BudgetAllocation;
    use crate::flatten::AllocationMap;
    use crate::hierarchy::BranchPath;

    #[derive(Serialize, Deserialize)]
    struct Entry<T> {
        parent: BranchPath,
        items: T,
    }

    pub fn serialize<S: Serializer>(map: &AllocationMap, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter().map(|(parent, items)| Entry {
            parent: parent.clone(),
            items,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AllocationMap, D::Error> {
        let entries = Vec::<Entry<Vec<BudgetAllocation>>>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| (e.parent, e.items)).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
