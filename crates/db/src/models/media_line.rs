//! Media line entity model and DTOs.

use mediaplan_core::allocation::MediaLineRef;
use mediaplan_core::hierarchy::HierarchyLevel;
use mediaplan_core::types::{DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `media_lines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaLine {
    pub id: DbId,
    pub plan_id: DbId,
    pub name: String,
    pub budget: Decimal,
    pub subdivision_id: Option<DbId>,
    pub moment_id: Option<DbId>,
    pub funnel_stage_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaLine {
    /// The fields the hierarchy engine needs.
    pub fn to_ref(&self) -> MediaLineRef {
        MediaLineRef {
            id: self.id,
            budget: self.budget,
            subdivision_id: self.subdivision_id,
            moment_id: self.moment_id,
            funnel_stage_id: self.funnel_stage_id,
        }
    }
}

/// DTO for creating a line. `plan_id` comes from the route.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaLine {
    pub name: String,
    pub budget: Decimal,
    pub subdivision_id: Option<DbId>,
    pub moment_id: Option<DbId>,
    pub funnel_stage_id: Option<DbId>,
}

/// DTO for updating a line. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaLine {
    pub name: Option<String>,
    pub budget: Option<Decimal>,
    pub subdivision_id: Option<DbId>,
    pub moment_id: Option<DbId>,
    pub funnel_stage_id: Option<DbId>,
    /// Dimensions to reset to NULL, moving the line into the General bucket
    /// of that level. Takes precedence over an id given for the same level.
    #[serde(default)]
    pub clear_dimensions: Vec<HierarchyLevel>,
}

impl UpdateMediaLine {
    pub fn clears(&self, level: HierarchyLevel) -> bool {
        self.clear_dimensions.contains(&level)
    }
}
