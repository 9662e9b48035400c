//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `Serialize` entity struct matching the database row
//! - The input DTO used for inserts and overwrites

pub mod attachment;
pub mod project;
pub mod stage;
