//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod budget_distribution_repo;
pub mod dimension_repo;
pub mod media_line_repo;
pub mod media_plan_repo;

pub use budget_distribution_repo::BudgetDistributionRepo;
pub use dimension_repo::DimensionRepo;
pub use media_line_repo::MediaLineRepo;
pub use media_plan_repo::MediaPlanRepo;
