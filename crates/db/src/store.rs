//! Transactional [`AllocationStore`] backed by PostgreSQL.
//!
//! A replacement (delete-all then re-insert) runs inside one transaction so
//! readers never see a half-written tree. Each insert additionally runs in its
//! own savepoint: a rejected row rolls back alone and the writer can carry on
//! with the branches that do not depend on it.

use async_trait::async_trait;
use mediaplan_core::allocation::{AllocationNode, NewAllocationNode};
use mediaplan_core::draft::{
    replace_distributions, DistributionDraft, PartialFailure, WriteOutcome,
};
use mediaplan_core::generator::{
    generate_budget_distributions_from_lines, GenerateError, GenerateRequest, GenerationReport,
};
use mediaplan_core::store::{AllocationStore, StoreError};
use mediaplan_core::types::DbId;
use sqlx::{Connection, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use crate::models::budget_distribution::BudgetDistribution;
use crate::repositories::budget_distribution_repo::COLUMNS;

/// An [`AllocationStore`] scoped to one open transaction.
///
/// Nothing is visible to other connections until [`commit`](Self::commit).
/// Dropping the store without committing rolls everything back.
pub struct PgAllocationStore {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl PgAllocationStore {
    pub async fn begin(pool: &PgPool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tx: Mutex::new(pool.begin().await?),
        })
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.into_inner().commit().await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.into_inner().rollback().await
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Constraint violations reject the row; anything else is a backend failure.
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => StoreError::Rejected(db.message().to_string()),
        other => backend(other),
    }
}

#[async_trait]
impl AllocationStore for PgAllocationStore {
    async fn fetch(&self, plan_id: DbId) -> Result<Vec<AllocationNode>, StoreError> {
        let mut tx = self.tx.lock().await;
        let query =
            format!("SELECT {COLUMNS} FROM budget_distributions WHERE plan_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, BudgetDistribution>(&query)
            .bind(plan_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(backend)?;
        rows.into_iter()
            .map(|row| AllocationNode::try_from(row).map_err(|e| StoreError::Rejected(e.to_string())))
            .collect()
    }

    async fn delete_all(&self, plan_id: DbId) -> Result<u64, StoreError> {
        let mut tx = self.tx.lock().await;
        let result = sqlx::query("DELETE FROM budget_distributions WHERE plan_id = $1")
            .bind(plan_id)
            .execute(&mut **tx)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, row: &NewAllocationNode) -> Result<DbId, StoreError> {
        let mut tx = self.tx.lock().await;
        let mut savepoint = Connection::begin(&mut **tx).await.map_err(backend)?;

        let inserted = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO budget_distributions
                (plan_id, distribution_type, reference_id, percentage, amount,
                 parent_distribution_id, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(row.plan_id)
        .bind(row.distribution_type.as_str())
        .bind(row.reference_id)
        .bind(row.percentage)
        .bind(row.amount)
        .bind(row.parent_distribution_id)
        .bind(row.start_date)
        .bind(row.end_date)
        .fetch_one(&mut *savepoint)
        .await;

        match inserted {
            Ok(id) => {
                savepoint.commit().await.map_err(backend)?;
                Ok(id)
            }
            Err(err) => {
                savepoint.rollback().await.map_err(backend)?;
                Err(classify(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction-wrapped operations
// ---------------------------------------------------------------------------

/// Replace a plan's rows with `draft` in one transaction.
///
/// Individual row failures are reported in the outcome and do not abort the
/// replacement; a failed delete rolls the whole transaction back.
pub async fn replace_plan_distributions(
    pool: &PgPool,
    plan_id: DbId,
    draft: &DistributionDraft,
) -> Result<WriteOutcome, StoreError> {
    let store = PgAllocationStore::begin(pool).await.map_err(backend)?;
    let outcome = replace_distributions(&store, plan_id, draft).await?;
    store.commit().await.map_err(backend)?;

    log_failures(plan_id, &outcome.failures);
    tracing::info!(
        plan_id,
        inserted = outcome.inserted,
        expected = outcome.expected,
        "Budget distributions replaced"
    );
    Ok(outcome)
}

/// Run the generator against the database in one transaction.
pub async fn generate_plan_distributions(
    pool: &PgPool,
    request: &GenerateRequest,
) -> Result<GenerationReport, GenerateError> {
    let store = PgAllocationStore::begin(pool).await.map_err(backend)?;
    let report = generate_budget_distributions_from_lines(&store, request).await?;
    store.commit().await.map_err(backend)?;

    log_failures(request.plan_id, &report.failures);
    for warning in &report.warnings {
        tracing::warn!(plan_id = request.plan_id, warning = %warning, "Generation warning");
    }
    tracing::info!(
        plan_id = request.plan_id,
        count = report.count,
        expected = report.expected,
        cleared = report.cleared,
        success = report.success,
        "Budget distributions generated"
    );
    Ok(report)
}

fn log_failures(plan_id: DbId, failures: &[PartialFailure]) {
    for failure in failures {
        tracing::warn!(
            plan_id,
            level = %failure.level,
            path = %failure.path,
            reason = ?failure.reason,
            "Distribution row not written"
        );
    }
}
