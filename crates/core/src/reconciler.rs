//! Orphan detection for media lines against a proposed allocation tree.
//!
//! Run before a tree replacement is committed so the caller can warn the
//! user. Detection is advisory; deleting the orphaned lines is a separate,
//! confirmed step.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::allocation::{AllocationNode, MediaLineRef};
use crate::draft::DistributionDraft;
use crate::hierarchy::{HierarchyLevel, HierarchyOrder};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Reference sets
// ---------------------------------------------------------------------------

/// The references present in a tree, per level.
///
/// A level with `None` is not part of the tree's order and places no
/// constraint on lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceSets {
    pub subdivision: Option<BTreeSet<DbId>>,
    pub moment: Option<BTreeSet<DbId>>,
    pub funnel_stage: Option<BTreeSet<DbId>>,
}

impl ReferenceSets {
    /// Empty, constrained sets for every level in `order`.
    pub fn for_order(order: &HierarchyOrder) -> Self {
        let mut sets = Self::default();
        for &level in order.levels() {
            *sets.slot_mut(level) = Some(BTreeSet::new());
        }
        sets
    }

    /// Collect references from stored rows whose type is part of `order`.
    pub fn from_nodes(order: &HierarchyOrder, nodes: &[AllocationNode]) -> Self {
        let mut sets = Self::for_order(order);
        for node in nodes {
            if let Some(id) = node.reference_id {
                sets.insert(node.distribution_type, id);
            }
        }
        sets
    }

    /// Collect references from a proposed (not yet saved) draft.
    pub fn from_draft(draft: &DistributionDraft) -> Self {
        let mut sets = Self::for_order(&draft.order);
        for node in &draft.nodes {
            if let Some(id) = node.reference_id {
                sets.insert(node.level, id);
            }
        }
        sets
    }

    /// Record a reference. Ignored for unconstrained levels.
    pub fn insert(&mut self, level: HierarchyLevel, id: DbId) {
        if let Some(set) = self.slot_mut(level) {
            set.insert(id);
        }
    }

    pub fn get(&self, level: HierarchyLevel) -> Option<&BTreeSet<DbId>> {
        match level {
            HierarchyLevel::Subdivision => self.subdivision.as_ref(),
            HierarchyLevel::Moment => self.moment.as_ref(),
            HierarchyLevel::FunnelStage => self.funnel_stage.as_ref(),
        }
    }

    fn slot_mut(&mut self, level: HierarchyLevel) -> &mut Option<BTreeSet<DbId>> {
        match level {
            HierarchyLevel::Subdivision => &mut self.subdivision,
            HierarchyLevel::Moment => &mut self.moment,
            HierarchyLevel::FunnelStage => &mut self.funnel_stage,
        }
    }
}

// ---------------------------------------------------------------------------
// Orphan report
// ---------------------------------------------------------------------------

/// A line that would lose one or more of its dimension references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanLine {
    pub id: DbId,
    /// Labels of every missing dimension, joined with ", ".
    pub reason: String,
    pub levels: Vec<HierarchyLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrphanReport {
    pub count: usize,
    pub lines: Vec<OrphanLine>,
}

impl OrphanReport {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn line_ids(&self) -> Vec<DbId> {
        self.lines.iter().map(|l| l.id).collect()
    }
}

/// Find lines holding a non-null reference that the proposed tree no longer has.
pub fn find_orphan_lines(lines: &[MediaLineRef], sets: &ReferenceSets) -> OrphanReport {
    let orphans: Vec<OrphanLine> = lines
        .iter()
        .filter_map(|line| {
            let levels: Vec<HierarchyLevel> = HierarchyLevel::ALL
                .into_iter()
                .filter(|&level| match (line.reference_at(level), sets.get(level)) {
                    (Some(id), Some(set)) => !set.contains(&id),
                    _ => false,
                })
                .collect();
            if levels.is_empty() {
                return None;
            }
            let reason = levels
                .iter()
                .map(|l| l.label())
                .collect::<Vec<_>>()
                .join(", ");
            Some(OrphanLine {
                id: line.id,
                reason,
                levels,
            })
        })
        .collect();

    OrphanReport {
        count: orphans.len(),
        lines: orphans,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
