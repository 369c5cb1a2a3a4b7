//! Core domain types for the triage agent.
//!
//! All of these are transient request/response values; nothing is persisted
//! locally.

pub mod fix;
pub mod ids;
pub mod remote;
pub mod tree;

// Re-export commonly used types at the module level
pub use fix::{FileChange, FixPlan};
pub use ids::{CommentId, InvalidRepoId, IssueNumber, PrNumber, RepoId, Sha};
pub use remote::{ChangedFile, CreatedPullRequest, FileSnapshot, Issue, PullRequest};
pub use tree::{EXCLUDED_PREFIXES, MAX_TREE_ENTRIES, RepoTree, TreeEntry, TreeEntryKind};
