//! Hierarchy dimensions, the plan-scoped level order, and typed branch paths.
//!
//! A plan's budget is split along up to three dimensions in a user-chosen
//! order. [`BranchPath`] identifies one branch of that split as an ordered
//! list of `(level, reference)` pairs and is the key used to link wizard
//! allocations, draft rows, and media lines across levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of levels in a hierarchy order.
pub const MAX_HIERARCHY_DEPTH: usize = 3;

/// Maximum number of subdivisions under a single parent.
pub const MAX_SUBDIVISIONS: usize = 12;

/// Maximum number of moments under a single parent.
pub const MAX_MOMENTS: usize = 12;

/// Maximum number of funnel stages under a single parent.
pub const MAX_FUNNEL_STAGES: usize = 7;

/// Display name of the synthetic bucket with no reference.
pub const GENERAL_LABEL: &str = "General";

// ---------------------------------------------------------------------------
// HierarchyLevel
// ---------------------------------------------------------------------------

/// One dimension a plan budget can be split along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Subdivision,
    Moment,
    FunnelStage,
}

impl HierarchyLevel {
    /// Every level, in canonical (reporting) order.
    pub const ALL: [HierarchyLevel; 3] = [Self::Subdivision, Self::Moment, Self::FunnelStage];

    /// Parse a level string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "subdivision" => Ok(Self::Subdivision),
            "moment" => Ok(Self::Moment),
            "funnel_stage" => Ok(Self::FunnelStage),
            _ => Err(CoreError::Validation(format!(
                "Invalid hierarchy level '{s}'. Must be one of: subdivision, moment, funnel_stage"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subdivision => "subdivision",
            Self::Moment => "moment",
            Self::FunnelStage => "funnel_stage",
        }
    }

    /// User-facing label, as shown in orphan warnings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Subdivision => "subdivisão",
            Self::Moment => "momento",
            Self::FunnelStage => "fase do funil",
        }
    }

    /// Maximum number of sibling items at this level.
    pub fn max_items(self) -> usize {
        match self {
            Self::Subdivision => MAX_SUBDIVISIONS,
            Self::Moment => MAX_MOMENTS,
            Self::FunnelStage => MAX_FUNNEL_STAGES,
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HierarchyOrder
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free sequence of at most [`MAX_HIERARCHY_DEPTH`] levels.
///
/// An empty order means the plan budget is not subdivided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<HierarchyLevel>", into = "Vec<HierarchyLevel>")]
pub struct HierarchyOrder(Vec<HierarchyLevel>);

impl HierarchyOrder {
    /// Validate and build an order.
    pub fn new(levels: Vec<HierarchyLevel>) -> Result<Self, CoreError> {
        if levels.len() > MAX_HIERARCHY_DEPTH {
            return Err(CoreError::Validation(format!(
                "Hierarchy order supports at most {MAX_HIERARCHY_DEPTH} levels, got {}",
                levels.len()
            )));
        }
        for (i, level) in levels.iter().enumerate() {
            if levels[..i].contains(level) {
                return Err(CoreError::Validation(format!(
                    "Hierarchy level '{level}' appears more than once"
                )));
            }
        }
        Ok(Self(levels))
    }

    /// The undivided order.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn levels(&self) -> &[HierarchyLevel] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Level expected at `depth` (0 = roots).
    pub fn level_at(&self, depth: usize) -> Option<HierarchyLevel> {
        self.0.get(depth).copied()
    }

    /// Depth at which `level` is split, if it is part of the order.
    pub fn depth_of(&self, level: HierarchyLevel) -> Option<usize> {
        self.0.iter().position(|l| *l == level)
    }

    pub fn contains(&self, level: HierarchyLevel) -> bool {
        self.0.contains(&level)
    }

    /// Parse the `TEXT[]` column representation.
    pub fn from_db_strings(values: &[String]) -> Result<Self, CoreError> {
        let levels = values
            .iter()
            .map(|v| HierarchyLevel::from_str_db(v))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(levels)
    }

    /// Render as the `TEXT[]` column representation.
    pub fn to_db_strings(&self) -> Vec<String> {
        self.0.iter().map(|l| l.as_str().to_string()).collect()
    }
}

impl TryFrom<Vec<HierarchyLevel>> for HierarchyOrder {
    type Error = CoreError;

    fn try_from(levels: Vec<HierarchyLevel>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<HierarchyOrder> for Vec<HierarchyLevel> {
    fn from(order: HierarchyOrder) -> Self {
        order.0
    }
}

impl fmt::Display for HierarchyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(|l| l.as_str()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Branch paths
// ---------------------------------------------------------------------------

/// One step of a branch path. `reference_id = None` is the General bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub level: HierarchyLevel,
    pub reference_id: Option<DbId>,
}

/// Position of a node in the hierarchy, from the root down.
///
/// The empty path is the plan itself (the parent of depth-0 nodes).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchPath(Vec<PathSegment>);

impl BranchPath {
    /// The plan-level path (no segments).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A new path one level deeper.
    pub fn child(&self, level: HierarchyLevel, reference_id: Option<DbId>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment {
            level,
            reference_id,
        });
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments; the depth of the node this path names is `depth() - 1`.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Reference held at `level`, or `None` if the path does not cross it.
    pub fn reference_at(&self, level: HierarchyLevel) -> Option<Option<DbId>> {
        self.0
            .iter()
            .find(|s| s.level == level)
            .map(|s| s.reference_id)
    }

    /// Whether every segment sits at the level the order expects for its depth.
    pub fn is_valid_for(&self, order: &HierarchyOrder) -> bool {
        self.0.len() <= order.len()
            && self
                .0
                .iter()
                .enumerate()
                .all(|(depth, s)| order.level_at(depth) == Some(s.level))
    }

    pub fn is_prefix_of(&self, other: &BranchPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment.reference_id {
                Some(id) => write!(f, "{}:{id}", segment.level)?,
                None => write!(f, "{}:general", segment.level)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
