//! Shared query parameter types for API handlers.

use crm_core::types::DbId;
use serde::Deserialize;

/// Query parameters for listing milestones (`?project_id=`).
#[derive(Debug, Deserialize)]
pub struct MilestoneListParams {
    pub project_id: DbId,
}

/// Query parameters for the allocation summary (`?exclude_id=`).
///
/// When editing, the client excludes the milestone being edited so its own
/// allocation does not count against itself.
#[derive(Debug, Deserialize)]
pub struct AllocationParams {
    pub exclude_id: Option<DbId>,
}
