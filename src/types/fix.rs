//! The structured fix plan produced by the model.

use serde::{Deserialize, Serialize};

/// A single file rewrite within a fix plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    /// The complete new file content (not a diff).
    pub content: String,
    pub commit_message: String,
}

/// A fix for an issue: the branch to create and the files to write on it.
///
/// A plan with no changes is invalid and must never be applied; see
/// [`FixPlan::has_changes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixPlan {
    pub summary: String,
    pub branch_name: String,
    pub changes: Vec<FileChange>,
}

impl FixPlan {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}
