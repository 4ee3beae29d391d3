//! Budget distribution hierarchy engine.
//!
//! Pure domain logic for fanning a plan budget out across an ordered set of
//! dimensions (subdivision, moment, funnel stage). Nothing here talks to the
//! database; persistence goes through the [`store::AllocationStore`] contract
//! and the API layer feeds in rows it fetched itself.

pub mod allocation;
pub mod audit;
pub mod draft;
pub mod error;
pub mod flatten;
pub mod generator;
pub mod hierarchy;
pub mod money;
pub mod reconciler;
pub mod store;
pub mod tree;
pub mod types;
pub mod wizard;
