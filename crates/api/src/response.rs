//! The `{ "data": ... }` envelope wrapped around every successful JSON
//! response. Errors use the `{ "error", "code", "field" }` shape from
//! [`crate::error::AppError`] instead.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
