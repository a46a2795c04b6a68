//! Route definitions for the `/milestones` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::milestone;
use crate::state::AppState;

/// Routes mounted at `/milestones`.
///
/// ```text
/// GET    /?project_id=     -> list_by_project
/// POST   /                 -> create
/// GET    /{id}             -> get_by_id
/// PATCH  /{id}             -> update
/// DELETE /{id}             -> delete
/// POST   /{id}/reschedule  -> reschedule
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(milestone::list_by_project).post(milestone::create))
        .route(
            "/{id}",
            get(milestone::get_by_id)
                .patch(milestone::update)
                .delete(milestone::delete),
        )
        .route("/{id}/reschedule", post(milestone::reschedule))
}
