//! Repository for the three dimension libraries.

use std::collections::HashMap;

use mediaplan_core::hierarchy::HierarchyLevel;
use mediaplan_core::types::DbId;
use sqlx::PgPool;

use crate::models::dimension::{CreateDimension, Dimension};

/// Table backing each level's library.
fn table(level: HierarchyLevel) -> &'static str {
    match level {
        HierarchyLevel::Subdivision => "subdivisions",
        HierarchyLevel::Moment => "moments",
        HierarchyLevel::FunnelStage => "funnel_stages",
    }
}

pub struct DimensionRepo;

impl DimensionRepo {
    pub async fn create(
        pool: &PgPool,
        level: HierarchyLevel,
        input: &CreateDimension,
    ) -> Result<Dimension, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING id, name, created_at",
            table(level)
        );
        sqlx::query_as::<_, Dimension>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// All entries of a library, alphabetically.
    pub async fn list(pool: &PgPool, level: HierarchyLevel) -> Result<Vec<Dimension>, sqlx::Error> {
        let query = format!(
            "SELECT id, name, created_at FROM {} ORDER BY name, id",
            table(level)
        );
        sqlx::query_as::<_, Dimension>(&query).fetch_all(pool).await
    }

    /// Id to name map for a library.
    pub async fn names_for(
        pool: &PgPool,
        level: HierarchyLevel,
    ) -> Result<HashMap<DbId, String>, sqlx::Error> {
        let rows: Vec<(DbId, String)> =
            sqlx::query_as(&format!("SELECT id, name FROM {}", table(level)))
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().collect())
    }
}
