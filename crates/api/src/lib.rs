//! Product-pipeline tracker API server library.
//!
//! Exposes the core building blocks (config, state, error handling, blob
//! storage, project lifecycle, routes) so integration tests and the binary
//! entrypoint can both access them.

pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod lifecycle;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
