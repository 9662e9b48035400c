pub mod attachment;
pub mod health;
pub mod project;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /dashboard                          projects + per-label counts
///
/// /projects                           list, create (multipart)
/// /projects/{id}                      get detail, edit (multipart), delete
/// /projects/{id}/attachments          list attachments
///
/// /attachments/{id}                   download, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .nest("/projects", project::router())
        .nest("/attachments", attachment::router())
}
