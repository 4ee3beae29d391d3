//! Route definitions for the `/plans` resource.
//!
//! Also nests the plan-scoped distribution and media line routes.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{distributions, media_lines, plans};
use crate::state::AppState;

/// Routes mounted at `/plans`.
///
/// ```text
/// GET    /                                  -> list
/// POST   /                                  -> create
/// GET    /{id}                              -> get_by_id
/// PUT    /{id}                              -> update
/// DELETE /{id}                              -> delete
/// PUT    /{id}/hierarchy-order              -> update_hierarchy_order
/// GET    /{id}/hierarchy                    -> get_hierarchy
///
/// GET    /{id}/distributions                -> list
/// PUT    /{id}/distributions                -> replace
/// POST   /{id}/distributions/preview        -> preview
/// POST   /{id}/distributions/generate       -> generate
///
/// GET    /{id}/media-lines                  -> list_by_plan
/// POST   /{id}/media-lines                  -> create
/// POST   /{id}/media-lines/delete-orphans   -> delete_orphans
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(plans::list).post(plans::create))
        .route(
            "/{id}",
            get(plans::get_by_id)
                .put(plans::update)
                .delete(plans::delete),
        )
        .route("/{id}/hierarchy-order", put(plans::update_hierarchy_order))
        .route("/{id}/hierarchy", get(plans::get_hierarchy))
        .route(
            "/{id}/distributions",
            get(distributions::list).put(distributions::replace),
        )
        .route("/{id}/distributions/preview", post(distributions::preview))
        .route("/{id}/distributions/generate", post(distributions::generate))
        .route(
            "/{id}/media-lines",
            get(media_lines::list_by_plan).post(media_lines::create),
        )
        .route(
            "/{id}/media-lines/delete-orphans",
            post(media_lines::delete_orphans),
        )
}
