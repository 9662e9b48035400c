use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::BlobStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: stagetrack_db::DbPool,
    /// Server configuration (upload policy, timeouts).
    pub config: Arc<ServerConfig>,
    /// Blob area holding uploaded attachment bytes.
    pub blobs: Arc<dyn BlobStore>,
}
