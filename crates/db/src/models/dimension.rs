//! Dimension library entries (subdivisions, moments, funnel stages).
//!
//! The three libraries share one shape, so a single row type serves all of
//! them; the table is chosen by [`HierarchyLevel`](mediaplan_core::hierarchy::HierarchyLevel).

use mediaplan_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dimension {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDimension {
    pub name: String,
}
