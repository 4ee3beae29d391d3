//! Wizard allocations to flat distribution rows.
//!
//! The wizard collects, for every parent branch, the percentage split of its
//! children at the next level. Flattening walks the order top-down, turns
//! percentages into amounts (rounded at every level), and fills any parent
//! the user did not subdivide with a single General bucket at 100%.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::allocation::BudgetAllocation;
use crate::draft::{DistributionDraft, DraftNode};
use crate::error::CoreError;
use crate::hierarchy::{BranchPath, HierarchyOrder};
use crate::money::{check_sibling_sum, share_of};

/// Allocations keyed by the path of the parent they split.
pub type AllocationMap = BTreeMap<BranchPath, Vec<BudgetAllocation>>;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate one sibling set entered for the children of `parent`.
///
/// Empty sets are allowed (they become a General bucket). Non-empty sets must
/// sum to 100, stay under the level's item cap, and not repeat a reference.
pub fn validate_allocation_set(
    order: &HierarchyOrder,
    parent: &BranchPath,
    items: &[BudgetAllocation],
) -> Result<(), CoreError> {
    let Some(level) = order.level_at(parent.depth()) else {
        return Err(CoreError::Validation(format!(
            "Branch '{parent}' is already at the deepest level of hierarchy order {order}"
        )));
    };
    if !parent.is_valid_for(order) {
        return Err(CoreError::Validation(format!(
            "Branch '{parent}' does not follow hierarchy order {order}"
        )));
    }
    if items.is_empty() {
        return Ok(());
    }
    if items.len() > level.max_items() {
        return Err(CoreError::Validation(format!(
            "At most {} {level} items are allowed under '{parent}', got {}",
            level.max_items(),
            items.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for item in items {
        if !seen.insert(item.reference_id) {
            return Err(CoreError::Validation(format!(
                "Duplicate {level} reference {} under '{parent}'",
                item.reference_id
                    .map_or_else(|| "general".to_string(), |id| id.to_string())
            )));
        }
        if let (Some(start), Some(end)) = (item.start_date, item.end_date) {
            if end < start {
                return Err(CoreError::Validation(format!(
                    "Allocation end date {end} is before start date {start} under '{parent}'"
                )));
            }
        }
    }

    check_sibling_sum(
        items.iter().map(|i| i.percentage),
        &format!("{level} under '{parent}'"),
    )
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Produce the top-down draft for a wizard allocation set.
///
/// Every sibling set is validated first; a single bad set rejects the whole
/// submission rather than persisting a tree that breaks the sum invariant.
/// Keys that are valid but never reached (their parent branch was not
/// created) are listed in [`DistributionDraft::skipped`].
pub fn flatten_allocations(
    order: &HierarchyOrder,
    total_budget: Decimal,
    allocations: &AllocationMap,
) -> Result<DistributionDraft, CoreError> {
    for (parent, items) in allocations {
        validate_allocation_set(order, parent, items)?;
    }

    let mut draft = DistributionDraft::new(order.clone(), total_budget);
    let mut reached: BTreeSet<&BranchPath> = BTreeSet::new();
    let general = [BudgetAllocation::general()];

    let mut frontier: Vec<(Option<usize>, BranchPath, Decimal)> =
        vec![(None, BranchPath::root(), total_budget)];

    for &level in order.levels() {
        let mut next = Vec::new();
        for (parent_idx, parent_path, parent_amount) in frontier {
            let items: &[BudgetAllocation] = match allocations.get_key_value(&parent_path) {
                Some((key, items)) if !items.is_empty() => {
                    reached.insert(key);
                    items
                }
                Some((key, _)) => {
                    reached.insert(key);
                    &general
                }
                None => &general,
            };

            for item in items {
                let path = parent_path.child(level, item.reference_id);
                let amount = share_of(parent_amount, item.percentage);
                let idx = draft.push(DraftNode {
                    path: path.clone(),
                    parent: parent_idx,
                    level,
                    reference_id: item.reference_id,
                    percentage: item.percentage,
                    amount,
                    start_date: item.start_date,
                    end_date: item.end_date,
                });
                next.push((Some(idx), path, amount));
            }
        }
        frontier = next;
    }

    draft.skipped = allocations
        .keys()
        .filter(|k| !reached.contains(k))
        .cloned()
        .collect();
    for path in &draft.skipped {
        draft
            .warnings
            .push(format!("Allocations under '{path}' have no parent branch and were skipped"));
    }

    Ok(draft)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyLevel::*;
    use crate::money::validate_percentages;
    use rust_decimal_macros::dec;

    fn alloc(reference_id: Option<i64>, percentage: Decimal) -> BudgetAllocation {
        BudgetAllocation::new(reference_id, percentage)
    }

    fn sub_moment() -> HierarchyOrder {
        HierarchyOrder::new(vec![Subdivision, Moment]).unwrap()
    }

    /// Scenario: 3000 split 50/50 by subdivision, each 50/50 by moment.
    fn scenario() -> AllocationMap {
        let mut map = AllocationMap::new();
        map.insert(
            BranchPath::root(),
            vec![alloc(Some(1), dec!(50)), alloc(Some(2), dec!(50))],
        );
        for sub in [1, 2] {
            map.insert(
                BranchPath::root().child(Subdivision, Some(sub)),
                vec![alloc(Some(10), dec!(50)), alloc(Some(20), dec!(50))],
            );
        }
        map
    }

    // -- flatten_allocations --

    #[test]
    fn scenario_produces_two_by_two_tree() {
        let draft = flatten_allocations(&sub_moment(), dec!(3000), &scenario()).unwrap();
        assert_eq!(draft.len(), 6);
        let roots: Vec<_> = draft.children_of(None).collect();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|(_, n)| n.amount == dec!(1500)));
        for (idx, _) in roots {
            let children: Vec<_> = draft.children_of(Some(idx)).collect();
            assert_eq!(children.len(), 2);
            assert!(children.iter().all(|(_, n)| n.amount == dec!(750)));
        }
        assert!(draft.skipped.is_empty());
    }

    #[test]
    fn rows_are_top_down() {
        let draft = flatten_allocations(&sub_moment(), dec!(3000), &scenario()).unwrap();
        for (idx, node) in draft.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(parent < idx);
            }
        }
    }

    #[test]
    fn missing_split_becomes_general() {
        let mut map = AllocationMap::new();
        map.insert(
            BranchPath::root(),
            vec![alloc(Some(1), dec!(60)), alloc(Some(2), dec!(40))],
        );
        let draft = flatten_allocations(&sub_moment(), dec!(1000), &map).unwrap();
        let leaves: Vec<_> = draft.leaves().collect();
        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|l| l.reference_id.is_none()));
        assert!(leaves.iter().all(|l| l.percentage == dec!(100)));
        assert_eq!(leaves[0].amount, dec!(600));
        assert_eq!(leaves[1].amount, dec!(400));
    }

    #[test]
    fn empty_split_becomes_general() {
        let mut map = AllocationMap::new();
        map.insert(BranchPath::root(), vec![]);
        let order = HierarchyOrder::new(vec![FunnelStage]).unwrap();
        let draft = flatten_allocations(&order, dec!(500), &map).unwrap();
        assert_eq!(draft.len(), 1);
        assert_eq!(draft.nodes[0].reference_id, None);
        assert_eq!(draft.nodes[0].amount, dec!(500));
    }

    #[test]
    fn empty_order_produces_no_rows() {
        let draft =
            flatten_allocations(&HierarchyOrder::empty(), dec!(500), &AllocationMap::new()).unwrap();
        assert!(draft.is_empty());
    }

    #[test]
    fn rounding_applies_per_level() {
        let order = sub_moment();
        let mut map = AllocationMap::new();
        map.insert(
            BranchPath::root(),
            vec![
                alloc(Some(1), dec!(33.33)),
                alloc(Some(2), dec!(33.33)),
                alloc(Some(3), dec!(33.34)),
            ],
        );
        map.insert(
            BranchPath::root().child(Subdivision, Some(1)),
            vec![alloc(Some(10), dec!(33.33)), alloc(Some(20), dec!(66.67))],
        );
        let draft = flatten_allocations(&order, dec!(100.01), &map).unwrap();
        for (idx, node) in draft.nodes.iter().enumerate() {
            let parent_amount = node
                .parent
                .map_or(draft.total_budget, |p| draft.nodes[p].amount);
            assert_eq!(node.amount, share_of(parent_amount, node.percentage), "row {idx}");
        }
        for parent in [None, Some(0)] {
            assert!(validate_percentages(draft.children_of(parent).map(|(_, n)| n.percentage)));
        }
    }

    #[test]
    fn rejects_bad_sum() {
        let mut map = AllocationMap::new();
        map.insert(
            BranchPath::root(),
            vec![alloc(Some(1), dec!(50)), alloc(Some(2), dec!(40))],
        );
        assert!(flatten_allocations(&sub_moment(), dec!(100), &map).is_err());
    }

    #[test]
    fn rejects_key_off_order() {
        let mut map = AllocationMap::new();
        map.insert(
            BranchPath::root().child(Moment, Some(1)),
            vec![alloc(Some(1), dec!(100))],
        );
        assert!(flatten_allocations(&sub_moment(), dec!(100), &map).is_err());
    }

    #[test]
    fn rejects_key_at_leaf_depth() {
        let mut map = AllocationMap::new();
        map.insert(
            BranchPath::root().child(Subdivision, Some(1)).child(Moment, Some(2)),
            vec![alloc(Some(3), dec!(100))],
        );
        assert!(flatten_allocations(&sub_moment(), dec!(100), &map).is_err());
    }

    #[test]
    fn unreachable_key_is_skipped_not_fatal() {
        let mut map = scenario();
        map.insert(
            BranchPath::root().child(Subdivision, Some(99)),
            vec![alloc(Some(10), dec!(100))],
        );
        let draft = flatten_allocations(&sub_moment(), dec!(3000), &map).unwrap();
        assert_eq!(draft.skipped, vec![BranchPath::root().child(Subdivision, Some(99))]);
        assert_eq!(draft.warnings.len(), 1);
        assert_eq!(draft.len(), 6);
    }

    // -- validate_allocation_set --

    #[test]
    fn rejects_duplicate_reference() {
        let items = vec![alloc(Some(1), dec!(50)), alloc(Some(1), dec!(50))];
        assert!(validate_allocation_set(&sub_moment(), &BranchPath::root(), &items).is_err());
    }

    #[test]
    fn rejects_too_many_funnel_stages() {
        let order = HierarchyOrder::new(vec![FunnelStage]).unwrap();
        let items: Vec<_> = (0..8).map(|i| alloc(Some(i), dec!(12.5))).collect();
        assert!(validate_allocation_set(&order, &BranchPath::root(), &items).is_err());
    }

    #[test]
    fn rejects_inverted_dates() {
        let mut item = alloc(Some(1), dec!(100));
        item.start_date = chrono::NaiveDate::from_ymd_opt(2026, 3, 1);
        item.end_date = chrono::NaiveDate::from_ymd_opt(2026, 2, 1);
        assert!(validate_allocation_set(&sub_moment(), &BranchPath::root(), &[item]).is_err());
    }
}
