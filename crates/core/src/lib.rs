//! Domain building blocks for the product-pipeline tracker.
//!
//! Nothing in this crate touches the database or the network: it holds the
//! stage catalogue, the tolerant form-field parsers, upload policy and the
//! shared error type used by the `db` and `api` crates.

pub mod error;
pub mod fields;
pub mod stage;
pub mod types;
pub mod upload;
