//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod milestone_repo;
pub mod project_repo;

pub use milestone_repo::MilestoneRepo;
pub use project_repo::ProjectRepo;
