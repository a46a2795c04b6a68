pub mod health;
pub mod milestone;
pub mod project;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /projects                                  list, create
/// /projects/{id}                             get
/// /projects/{id}/allocation                  allocation summary
///
/// /milestones?project_id=                    list, create
/// /milestones/{id}                           get, update, delete
/// /milestones/{id}/reschedule                reschedule (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/milestones", milestone::router())
}
