//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Single
//! statement methods accept any [`sqlx::PgExecutor`] so they run against the
//! pool or inside a caller's transaction alike; methods issuing several
//! statements take `&mut PgConnection` and expect the caller to own the
//! transaction.

pub mod attachment_repo;
pub mod project_repo;
pub mod stage_repo;

pub use attachment_repo::AttachmentRepo;
pub use project_repo::ProjectRepo;
pub use stage_repo::StageRepo;
