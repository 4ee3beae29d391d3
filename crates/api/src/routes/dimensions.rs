//! Route definitions for the `/dimensions` libraries.

use axum::routing::get;
use axum::Router;

use crate::handlers::dimensions;
use crate::state::AppState;

/// Routes mounted at `/dimensions`.
///
/// ```text
/// GET    /{level}   -> list
/// POST   /{level}   -> create
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{level}", get(dimensions::list).post(dimensions::create))
}
