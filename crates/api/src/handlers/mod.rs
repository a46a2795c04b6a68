pub mod milestone;
pub mod project;
