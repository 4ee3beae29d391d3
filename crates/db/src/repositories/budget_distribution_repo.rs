//! Read-side repository for the `budget_distributions` table.
//!
//! Writes go through [`PgAllocationStore`](crate::store::PgAllocationStore)
//! so a replacement always runs in one transaction.

use mediaplan_core::types::DbId;
use sqlx::PgPool;

use crate::models::budget_distribution::BudgetDistribution;

pub(crate) const COLUMNS: &str = "id, plan_id, distribution_type, reference_id, percentage, \
     amount, parent_distribution_id, start_date, end_date, created_at";

pub struct BudgetDistributionRepo;

impl BudgetDistributionRepo {
    /// All rows of a plan in insertion order.
    pub async fn list_by_plan(
        pool: &PgPool,
        plan_id: DbId,
    ) -> Result<Vec<BudgetDistribution>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM budget_distributions WHERE plan_id = $1 ORDER BY id");
        sqlx::query_as::<_, BudgetDistribution>(&query)
            .bind(plan_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_plan(pool: &PgPool, plan_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM budget_distributions WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Remove every row of a plan. Returns the number removed.
    pub async fn delete_by_plan(pool: &PgPool, plan_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM budget_distributions WHERE plan_id = $1")
            .bind(plan_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
