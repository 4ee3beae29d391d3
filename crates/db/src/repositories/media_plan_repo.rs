//! Repository for the `media_plans` table.

use mediaplan_core::hierarchy::HierarchyOrder;
use mediaplan_core::types::DbId;
use sqlx::PgPool;

use crate::models::media_plan::{CreateMediaPlan, MediaPlan, UpdateMediaPlan};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, total_budget, hierarchy_order, start_date, end_date, created_at, updated_at";

/// Provides CRUD operations for media plans.
pub struct MediaPlanRepo;

impl MediaPlanRepo {
    /// Insert a new plan, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateMediaPlan) -> Result<MediaPlan, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_plans (name, total_budget, hierarchy_order, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaPlan>(&query)
            .bind(&input.name)
            .bind(input.total_budget)
            .bind(input.hierarchy_order.to_db_strings())
            .bind(input.start_date)
            .bind(input.end_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaPlan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_plans WHERE id = $1");
        sqlx::query_as::<_, MediaPlan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all plans, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<MediaPlan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_plans ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, MediaPlan>(&query).fetch_all(pool).await
    }

    /// Update plan metadata. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMediaPlan,
    ) -> Result<Option<MediaPlan>, sqlx::Error> {
        let query = format!(
            "UPDATE media_plans SET
                name = COALESCE($2, name),
                total_budget = COALESCE($3, total_budget),
                start_date = COALESCE($4, start_date),
                end_date = COALESCE($5, end_date)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaPlan>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.total_budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .fetch_optional(pool)
            .await
    }

    /// Replace the plan's hierarchy order. Existing distribution rows are left
    /// as they are; callers audit them against the new order.
    pub async fn update_hierarchy_order(
        pool: &PgPool,
        id: DbId,
        order: &HierarchyOrder,
    ) -> Result<Option<MediaPlan>, sqlx::Error> {
        let query = format!(
            "UPDATE media_plans SET hierarchy_order = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaPlan>(&query)
            .bind(id)
            .bind(order.to_db_strings())
            .fetch_optional(pool)
            .await
    }

    /// Delete a plan and, through cascades, its distributions and lines.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_plans WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
