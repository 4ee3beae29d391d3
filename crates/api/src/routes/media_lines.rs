//! Route definitions for line-scoped `/media-lines` operations.

use axum::routing::put;
use axum::Router;

use crate::handlers::media_lines;
use crate::state::AppState;

/// Routes mounted at `/media-lines`.
///
/// ```text
/// PUT    /{id}     -> update
/// DELETE /{id}     -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        put(media_lines::update).delete(media_lines::delete),
    )
}
