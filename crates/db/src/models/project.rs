//! Project entity model and DTOs.

use chrono::NaiveDate;
use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A project row from the `projects` table.
///
/// Milestone rules only read `project_value` and `end_date`; they are
/// serialized as `projectValue` / `endDate` for the console.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    #[serde(rename = "projectValue")]
    pub project_value: f64,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 255, message = "Project name must be 1-255 characters"))]
    pub name: String,
    #[serde(alias = "projectValue")]
    #[validate(range(min = 0.0, message = "Project value cannot be negative"))]
    pub project_value: f64,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<NaiveDate>,
}
