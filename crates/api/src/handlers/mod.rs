//! Request handlers.
//!
//! Handlers parse the request, delegate to [`crate::lifecycle`] or the
//! repositories in `stagetrack_db`, and map errors via
//! [`AppError`](crate::error::AppError).

pub mod attachment;
pub mod dashboard;
pub mod project;
