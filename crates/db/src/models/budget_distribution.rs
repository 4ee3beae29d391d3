//! Budget distribution rows (the flat allocation tree).

use mediaplan_core::allocation::AllocationNode;
use mediaplan_core::error::CoreError;
use mediaplan_core::hierarchy::HierarchyLevel;
use mediaplan_core::types::{Date, DbId, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `budget_distributions` table.
///
/// Rows are never edited one at a time; the whole set for a plan is replaced
/// through [`PgAllocationStore`](crate::store::PgAllocationStore), so there
/// are no create/update DTOs here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BudgetDistribution {
    pub id: DbId,
    pub plan_id: DbId,
    pub distribution_type: String,
    pub reference_id: Option<DbId>,
    pub percentage: Decimal,
    pub amount: Decimal,
    pub parent_distribution_id: Option<DbId>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub created_at: Timestamp,
}

impl TryFrom<BudgetDistribution> for AllocationNode {
    type Error = CoreError;

    fn try_from(row: BudgetDistribution) -> Result<Self, Self::Error> {
        Ok(AllocationNode {
            id: row.id,
            plan_id: row.plan_id,
            distribution_type: HierarchyLevel::from_str_db(&row.distribution_type)?,
            reference_id: row.reference_id,
            percentage: row.percentage,
            amount: row.amount,
            parent_distribution_id: row.parent_distribution_id,
            start_date: row.start_date,
            end_date: row.end_date,
        })
    }
}

/// Convert fetched rows into engine nodes.
pub fn into_nodes(rows: Vec<BudgetDistribution>) -> Result<Vec<AllocationNode>, CoreError> {
    rows.into_iter().map(AllocationNode::try_from).collect()
}
