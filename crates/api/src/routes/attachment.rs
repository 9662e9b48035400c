use axum::routing::get;
use axum::Router;

use crate::handlers::attachment;
use crate::state::AppState;

/// Routes mounted at `/attachments`.
///
/// ```text
/// GET    /{id}    -> download
/// DELETE /{id}    -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(attachment::download).delete(attachment::delete))
}
