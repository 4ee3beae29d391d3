//! Media plan entity model and DTOs.

use mediaplan_core::error::CoreError;
use mediaplan_core::hierarchy::HierarchyOrder;
use mediaplan_core::types::{Date, DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `media_plans` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaPlan {
    pub id: DbId,
    pub name: String,
    pub total_budget: Decimal,
    /// Level names as stored; parse with [`MediaPlan::order`].
    pub hierarchy_order: Vec<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaPlan {
    pub fn order(&self) -> Result<HierarchyOrder, CoreError> {
        HierarchyOrder::from_db_strings(&self.hierarchy_order)
    }
}

/// DTO for creating a new plan.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaPlan {
    pub name: String,
    pub total_budget: Decimal,
    /// Defaults to the undivided order.
    #[serde(default)]
    pub hierarchy_order: HierarchyOrder,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

/// DTO for updating plan metadata. The order has its own endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaPlan {
    pub name: Option<String>,
    pub total_budget: Option<Decimal>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}
