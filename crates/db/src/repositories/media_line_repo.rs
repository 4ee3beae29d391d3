//! Repository for the `media_lines` table.

use mediaplan_core::hierarchy::HierarchyLevel;
use mediaplan_core::types::DbId;
use sqlx::PgPool;

use crate::models::media_line::{CreateMediaLine, MediaLine, UpdateMediaLine};

const COLUMNS: &str = "id, plan_id, name, budget, subdivision_id, moment_id, funnel_stage_id, \
     created_at, updated_at";

/// Provides CRUD operations for media lines.
pub struct MediaLineRepo;

impl MediaLineRepo {
    pub async fn create(
        pool: &PgPool,
        plan_id: DbId,
        input: &CreateMediaLine,
    ) -> Result<MediaLine, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_lines (plan_id, name, budget, subdivision_id, moment_id, funnel_stage_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaLine>(&query)
            .bind(plan_id)
            .bind(&input.name)
            .bind(input.budget)
            .bind(input.subdivision_id)
            .bind(input.moment_id)
            .bind(input.funnel_stage_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaLine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_lines WHERE id = $1");
        sqlx::query_as::<_, MediaLine>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All lines of a plan in creation order.
    pub async fn list_by_plan(pool: &PgPool, plan_id: DbId) -> Result<Vec<MediaLine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_lines WHERE plan_id = $1 ORDER BY id");
        sqlx::query_as::<_, MediaLine>(&query)
            .bind(plan_id)
            .fetch_all(pool)
            .await
    }

    /// Update a line. Only non-`None` fields in `input` are applied, except
    /// that levels listed in `clear_dimensions` are set to NULL.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMediaLine,
    ) -> Result<Option<MediaLine>, sqlx::Error> {
        let query = format!(
            "UPDATE media_lines SET
                name = COALESCE($2, name),
                budget = COALESCE($3, budget),
                subdivision_id = CASE WHEN $7 THEN NULL ELSE COALESCE($4, subdivision_id) END,
                moment_id = CASE WHEN $8 THEN NULL ELSE COALESCE($5, moment_id) END,
                funnel_stage_id = CASE WHEN $9 THEN NULL ELSE COALESCE($6, funnel_stage_id) END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaLine>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.budget)
            .bind(input.subdivision_id)
            .bind(input.moment_id)
            .bind(input.funnel_stage_id)
            .bind(input.clears(HierarchyLevel::Subdivision))
            .bind(input.clears(HierarchyLevel::Moment))
            .bind(input.clears(HierarchyLevel::FunnelStage))
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_lines WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the given lines, restricted to one plan. Ids belonging to other
    /// plans are ignored. Returns the number removed.
    pub async fn delete_many_in_plan(
        pool: &PgPool,
        plan_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_lines WHERE plan_id = $1 AND id = ANY($2)")
            .bind(plan_id)
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
