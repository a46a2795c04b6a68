//! Domain logic for the CRM console backend.
//!
//! Everything in this crate is pure: no database, no HTTP. The `db` and `api`
//! crates build on these types so the same rules run wherever a milestone is
//! validated or persisted.

pub mod assignees;
pub mod currency;
pub mod error;
pub mod milestone;
pub mod types;
