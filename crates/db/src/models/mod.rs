//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! the `Deserialize` DTOs used for inserts.

pub mod milestone;
pub mod project;
