//! Storage contract for the flat allocation table.
//!
//! The engine never talks to a database directly. Writers (the flattener and
//! the generator) need ids back from each insert before they can insert the
//! next level, so the contract is async and sequential per call.

use async_trait::async_trait;

use crate::allocation::{AllocationNode, NewAllocationNode};
use crate::types::DbId;

/// Failure reported by an [`AllocationStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage rejected row: {0}")]
    Rejected(String),
}

/// Reads and writes a plan's allocation rows.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// All rows for a plan. An empty result is the valid "ungenerated" state.
    async fn fetch(&self, plan_id: DbId) -> Result<Vec<AllocationNode>, StoreError>;

    /// Remove every row for a plan, returning how many were removed.
    async fn delete_all(&self, plan_id: DbId) -> Result<u64, StoreError>;

    /// Insert one row and return its generated id.
    async fn insert(&self, row: &NewAllocationNode) -> Result<DbId, StoreError>;

    /// Insert rows in order, one result per row. A failed row does not stop
    /// the rows after it.
    async fn insert_many(&self, rows: &[NewAllocationNode]) -> Vec<Result<DbId, StoreError>> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(self.insert(row).await);
        }
        results
    }
}
