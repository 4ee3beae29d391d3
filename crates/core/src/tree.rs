//! Flat allocation rows back into an ordered, named tree.
//!
//! The read path is tolerant: rows that do not fit the plan's current order
//! (stale type, too deep, dangling parent) are dropped and reported as
//! warnings instead of failing the whole read, and duplicate siblings are
//! merged. Media lines are attached to the childless nodes whose path they
//! match.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::{AllocationNode, MediaLineRef};
use crate::hierarchy::{BranchPath, HierarchyLevel, HierarchyOrder, GENERAL_LABEL};
use crate::types::DbId;

/// Name of the synthetic root of an undivided plan.
pub const PLAN_ROOT_LABEL: &str = "Total";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One node of the rendered hierarchy. Built fresh on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyTreeNode {
    /// `None` only for the synthetic root of an undivided plan.
    pub level: Option<HierarchyLevel>,
    pub reference_id: Option<DbId>,
    pub name: String,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub children: Vec<HierarchyTreeNode>,
    /// Media lines attached to this node (childless nodes only).
    pub line_ids: Vec<DbId>,
    /// Budget of the media lines at or below this node.
    pub line_budget: Decimal,
}

impl HierarchyTreeNode {
    /// Depth-first iterator over this node and its descendants.
    pub fn walk(&self) -> Vec<&HierarchyTreeNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// A built tree plus everything the tolerant read had to drop or could not place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyTree {
    pub roots: Vec<HierarchyTreeNode>,
    pub warnings: Vec<String>,
    /// Lines that matched no childless node.
    pub unassigned_line_ids: Vec<DbId>,
}

impl HierarchyTree {
    /// Whether anything was dropped, merged, or left unplaced.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Builder<'a, F> {
    order: &'a HierarchyOrder,
    children_by_parent: HashMap<Option<DbId>, Vec<&'a AllocationNode>>,
    lines: &'a [MediaLineRef],
    name_resolver: F,
    assigned: HashSet<DbId>,
    visited: HashSet<DbId>,
    warnings: Vec<String>,
}

impl<'a, F> Builder<'a, F>
where
    F: Fn(HierarchyLevel, DbId) -> String,
{
    /// Build the children of the node group `parents` (empty = roots).
    fn build_children(
        &mut self,
        parents: &[DbId],
        depth: usize,
        parent_path: &BranchPath,
    ) -> Vec<HierarchyTreeNode> {
        let mut candidates: Vec<&'a AllocationNode> = if parents.is_empty() {
            self.children_by_parent.get(&None).cloned().unwrap_or_default()
        } else {
            parents
                .iter()
                .flat_map(|p| self.children_by_parent.get(&Some(*p)).cloned().unwrap_or_default())
                .collect()
        };
        candidates.sort_by_key(|n| n.id);

        // Keep rows that fit the order at this depth, grouped by reference in
        // first-seen order.
        let mut groups: Vec<(Option<DbId>, Vec<&'a AllocationNode>)> = Vec::new();
        for node in candidates {
            self.visited.insert(node.id);
            match self.order.level_at(depth) {
                None => {
                    self.warnings.push(format!(
                        "Distribution {} sits below the deepest level of hierarchy order {}; ignored",
                        node.id, self.order
                    ));
                    continue;
                }
                Some(expected) if expected != node.distribution_type => {
                    self.warnings.push(format!(
                        "Distribution {} has type '{}' but depth {depth} expects '{expected}'; ignored",
                        node.id, node.distribution_type
                    ));
                    continue;
                }
                Some(_) => {}
            }
            match groups.iter_mut().find(|(r, _)| *r == node.reference_id) {
                Some((_, group)) => group.push(node),
                None => groups.push((node.reference_id, vec![node])),
            }
        }

        let Some(level) = self.order.level_at(depth) else {
            return Vec::new();
        };

        groups
            .into_iter()
            .map(|(reference_id, group)| self.build_node(level, reference_id, &group, depth, parent_path))
            .collect()
    }

    fn build_node(
        &mut self,
        level: HierarchyLevel,
        reference_id: Option<DbId>,
        group: &[&'a AllocationNode],
        depth: usize,
        parent_path: &BranchPath,
    ) -> HierarchyTreeNode {
        if group.len() > 1 {
            let ids: Vec<String> = group.iter().map(|n| n.id.to_string()).collect();
            self.warnings.push(format!(
                "Duplicate {level} distributions for the same branch merged: {}",
                ids.join(", ")
            ));
        }

        let path = parent_path.child(level, reference_id);
        let group_ids: Vec<DbId> = group.iter().map(|n| n.id).collect();
        let children = self.build_children(&group_ids, depth + 1, &path);

        let (line_ids, line_budget) = if children.is_empty() {
            self.attach_lines(&path)
        } else {
            (Vec::new(), children.iter().map(|c| c.line_budget).sum())
        };

        let name = match reference_id {
            Some(id) => (self.name_resolver)(level, id),
            None => GENERAL_LABEL.to_string(),
        };

        HierarchyTreeNode {
            level: Some(level),
            reference_id,
            name,
            amount: group.iter().map(|n| n.amount).sum(),
            percentage: group.iter().map(|n| n.percentage).sum(),
            children,
            line_ids,
            line_budget,
        }
    }

    fn attach_lines(&mut self, path: &BranchPath) -> (Vec<DbId>, Decimal) {
        let mut ids = Vec::new();
        let mut budget = Decimal::ZERO;
        for line in self.lines {
            if !self.assigned.contains(&line.id) && line.matches_path(path) {
                self.assigned.insert(line.id);
                ids.push(line.id);
                budget += line.budget;
            }
        }
        (ids, budget)
    }
}

/// Rebuild the hierarchy for a plan from its flat rows and media lines.
///
/// `name_resolver` is only called for non-null references; the General
/// bucket is always named [`GENERAL_LABEL`]. With an empty order the result
/// is a single root holding the whole budget and every line.
pub fn build_hierarchy_tree<F>(
    nodes: &[AllocationNode],
    lines: &[MediaLineRef],
    order: &HierarchyOrder,
    total_budget: Decimal,
    name_resolver: F,
) -> HierarchyTree
where
    F: Fn(HierarchyLevel, DbId) -> String,
{
    if order.is_empty() {
        let mut warnings = Vec::new();
        if !nodes.is_empty() {
            warnings.push(format!(
                "{} distribution rows ignored: plan has no hierarchy order",
                nodes.len()
            ));
        }
        let root = HierarchyTreeNode {
            level: None,
            reference_id: None,
            name: PLAN_ROOT_LABEL.to_string(),
            amount: total_budget,
            percentage: Decimal::ONE_HUNDRED,
            children: Vec::new(),
            line_ids: lines.iter().map(|l| l.id).collect(),
            line_budget: lines.iter().map(|l| l.budget).sum(),
        };
        return HierarchyTree {
            roots: vec![root],
            warnings,
            unassigned_line_ids: Vec::new(),
        };
    }

    let ids: HashSet<DbId> = nodes.iter().map(|n| n.id).collect();
    let mut children_by_parent: HashMap<Option<DbId>, Vec<&AllocationNode>> = HashMap::new();
    let mut warnings = Vec::new();
    for node in nodes {
        match node.parent_distribution_id {
            Some(parent) if !ids.contains(&parent) => warnings.push(format!(
                "Distribution {} references missing parent {parent}; ignored",
                node.id
            )),
            parent => children_by_parent.entry(parent).or_default().push(node),
        }
    }

    let mut builder = Builder {
        order,
        children_by_parent,
        lines,
        name_resolver,
        assigned: HashSet::new(),
        visited: HashSet::new(),
        warnings,
    };
    let roots = builder.build_children(&[], 0, &BranchPath::root());

    // Rows under a dropped parent (or caught in a parent cycle) never get visited.
    let unreachable = nodes
        .iter()
        .filter(|n| !builder.visited.contains(&n.id))
        .filter(|n| n.parent_distribution_id.is_some_and(|p| ids.contains(&p)))
        .count();
    if unreachable > 0 {
        builder.warnings.push(format!(
            "{unreachable} distribution rows are unreachable from the roots; ignored"
        ));
    }

    let unassigned_line_ids: Vec<DbId> = lines
        .iter()
        .filter(|l| !builder.assigned.contains(&l.id))
        .map(|l| l.id)
        .collect();
    if !unassigned_line_ids.is_empty() {
        builder.warnings.push(format!(
            "{} media lines do not match any branch of the hierarchy",
            unassigned_line_ids.len()
        ));
    }

    HierarchyTree {
        roots,
        warnings: builder.warnings,
        unassigned_line_ids,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
