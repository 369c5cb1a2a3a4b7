//! Structured fix generation with bounded regeneration.
//!
//! The model is asked for a [`FixPlan`] constrained by [`fix_schema`]. A
//! reply that fails the call, does not match the schema, or contains no
//! changes is a failed attempt. After [`MAX_GENERATION_ATTEMPTS`] failed
//! attempts the last error is returned unchanged.

use serde_json::json;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{LanguageModel, LlmError, ResultSchema};
use crate::types::{FileSnapshot, FixPlan, Issue, RepoId, RepoTree};

/// Attempts made before giving up on generation.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Errors from a single generation attempt.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("generated fix does not match the schema: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("Generated fix contains no changes")]
    NoChanges,
}

/// The result schema a fix plan must satisfy.
pub fn fix_schema() -> ResultSchema {
    ResultSchema::new(
        "fix",
        "A code fix for the GitHub issue",
        json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "What the fix does"
                },
                "branch_name": {
                    "type": "string",
                    "description": "Branch name, e.g. fix/issue-42-null-check"
                },
                "changes": {
                    "type": "array",
                    "description": "File changes to apply",
                    "items": {
                        "type": "object",
                        "description": "A single file change",
                        "properties": {
                            "path": { "type": "string", "description": "File path" },
                            "content": {
                                "type": "string",
                                "description": "Complete updated file content"
                            },
                            "commit_message": {
                                "type": "string",
                                "description": "Commit message for this change"
                            }
                        },
                        "required": ["path", "content", "commit_message"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["summary", "branch_name", "changes"],
            "additionalProperties": false
        }),
    )
}

/// The system prompt: the repository layout and the selected files in full.
pub fn generation_system_prompt(repo: &RepoId, tree: &RepoTree, files: &[FileSnapshot]) -> String {
    let file_list = tree
        .paths()
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut contents = String::new();
    for file in files {
        let _ = write!(contents, "\n--- {} ---\n{}\n", file.path, file.content);
    }

    format!(
        "You are a senior software engineer generating a code fix for a GitHub issue.\n\
Repository: {repo}\n\
\n\
Project structure:\n\
{file_list}\n\
\n\
File contents:\n\
{contents}\n\
\n\
Generate a fix that:\n\
- Modifies only the files necessary\n\
- Returns complete file contents (not diffs)\n\
- Uses a descriptive branch name like fix/issue-42-short-description\n\
- Includes clear commit messages\n"
    )
}

/// The user prompt naming the issue to fix.
pub fn generation_prompt(issue: &Issue) -> String {
    format!(
        "Fix this issue:\n\nTitle: {}\n\n{}",
        issue.title,
        issue.body_text()
    )
}

async fn generate_once<M: LanguageModel>(
    model: &M,
    system: &str,
    prompt: &str,
    schema: &ResultSchema,
) -> Result<FixPlan, GenerationError> {
    let value = model.complete_structured(system, prompt, schema).await?;
    let plan: FixPlan = serde_json::from_value(value).map_err(GenerationError::Schema)?;
    if !plan.has_changes() {
        return Err(GenerationError::NoChanges);
    }
    Ok(plan)
}

/// Generates a non-empty fix plan, regenerating up to three times.
pub async fn generate_fix<M: LanguageModel>(
    model: &M,
    system: &str,
    prompt: &str,
) -> Result<FixPlan, GenerationError> {
    let schema = fix_schema();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match generate_once(model, system, prompt, &schema).await {
            Ok(plan) => {
                info!(
                    attempt,
                    branch = %plan.branch_name,
                    changes = plan.changes.len(),
                    "Generated fix plan"
                );
                return Ok(plan);
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = MAX_GENERATION_ATTEMPTS,
                    error = %e,
                    "Fix generation attempt failed"
                );
                if attempt >= MAX_GENERATION_ATTEMPTS {
                    return Err(e);
                }
            }
        }
    }
}
