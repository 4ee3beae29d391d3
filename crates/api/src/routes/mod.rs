pub mod dimensions;
pub mod health;
pub mod media_lines;
pub mod plans;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /plans                                           list, create
/// /plans/{id}                                      get, update, delete
/// /plans/{id}/hierarchy-order                      change order (PUT)
/// /plans/{id}/hierarchy                            built tree + audit (GET)
/// /plans/{id}/distributions                        flat rows (GET), wizard submit (PUT)
/// /plans/{id}/distributions/preview                orphan preview (POST)
/// /plans/{id}/distributions/generate               generate from lines (POST)
/// /plans/{id}/media-lines                          list, create
/// /plans/{id}/media-lines/delete-orphans           confirmed orphan deletion (POST)
///
/// /media-lines/{id}                                update, delete
///
/// /dimensions/{level}                              list, create
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/plans", plans::router())
        .nest("/media-lines", media_lines::router())
        .nest("/dimensions", dimensions::router())
}
