//! Picking the files a fix is likely to touch.

use thiserror::Error;
use tracing::{debug, info};

use crate::llm::{LanguageModel, LlmError, strip_code_fence};
use crate::retry::{ExhaustedRetries, Executor};
use crate::types::{Issue, RepoTree};

/// How many paths the model is asked for.
pub const MAX_SELECTED_FILES: usize = 5;

const SELECTION_SYSTEM_PROMPT: &str = "You are a senior software engineer. \
Given a GitHub issue and a repository file tree, \
select the files most likely relevant to fixing the issue. Return ONLY a JSON array of \
file paths (max 5). No explanation, no markdown, just the JSON array.";

/// Errors from file selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The model failed on every attempt.
    #[error(transparent)]
    Model(#[from] ExhaustedRetries<LlmError>),

    /// The reply was not a JSON array of strings.
    #[error("file selection is not a JSON array of paths: {0}")]
    InvalidReply(#[from] serde_json::Error),
}

/// The user prompt for file selection.
pub fn selection_prompt(issue: &Issue, tree: &RepoTree) -> String {
    format!(
        "Issue: {}\n\n{}\n\nFiles:\n{}",
        issue.title,
        issue.body_text(),
        tree.paths().join("\n")
    )
}

/// Asks the model which files are relevant to `issue`.
///
/// The reply is returned as given: paths are not checked against `tree` and
/// the count is not enforced, so a hallucinated path surfaces later as a
/// failed content fetch.
pub async fn select_files<M>(
    model: &M,
    executor: &Executor,
    issue: &Issue,
    tree: &RepoTree,
) -> Result<Vec<String>, SelectionError>
where
    M: LanguageModel,
{
    let prompt = selection_prompt(issue, tree);
    let reply = executor
        .execute("select files", || {
            model.complete(SELECTION_SYSTEM_PROMPT, &prompt)
        })
        .await?;

    debug!(reply = %reply, "File selection reply");
    let paths: Vec<String> = serde_json::from_str(strip_code_fence(&reply))?;
    info!(count = paths.len(), files = ?paths, "Selected files");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::Delay;
    use crate::retry::RetryConfig;
    use crate::test_utils::MockModel;
    use crate::types::{IssueNumber, TreeEntry};

    fn issue() -> Issue {
        Issue {
            number: IssueNumber(42),
            title: "Auth bug".into(),
            body: Some("Login crashes on null user".into()),
        }
    }

    fn tree() -> RepoTree {
        RepoTree::from_entries([
            TreeEntry::blob("app/Models/User.php"),
            TreeEntry::blob("app/Services/AuthService.php"),
        ])
    }

    fn executor() -> Executor {
        Executor::new(RetryConfig::DEFAULT, Delay::none())
    }

    #[test]
    fn prompt_lists_issue_and_tree() {
        let prompt = selection_prompt(&issue(), &tree());
        assert_eq!(
            prompt,
            "Issue: Auth bug\n\nLogin crashes on null user\n\n\
             Files:\napp/Models/User.php\napp/Services/AuthService.php"
        );
    }

    #[tokio::test]
    async fn fenced_reply_is_parsed() {
        let model = MockModel::with_text(["```json\n[\"app/Models/User.php\"]\n```"]);

        let paths = select_files(&model, &executor(), &issue(), &tree())
            .await
            .unwrap();

        assert_eq!(paths, vec!["app/Models/User.php"]);
        assert!(model.systems()[0].contains("max 5"));
    }

    #[tokio::test]
    async fn paths_outside_the_tree_are_returned_verbatim() {
        let model = MockModel::with_text([r#"["does/not/exist.php"]"#]);

        let paths = select_files(&model, &executor(), &issue(), &tree())
            .await
            .unwrap();

        assert_eq!(paths, vec!["does/not/exist.php"]);
    }

    #[tokio::test]
    async fn prose_reply_is_rejected() {
        let model = MockModel::with_text(["I think you should look at User.php"]);

        let err = select_files(&model, &executor(), &issue(), &tree())
            .await
            .unwrap_err();

        assert!(matches!(err, SelectionError::InvalidReply(_)));
    }

    #[tokio::test]
    async fn model_failures_are_retried() {
        let model = MockModel::default();
        model.push_text_error("overloaded");
        model.push_text("[]");

        let paths = select_files(&model, &executor(), &issue(), &tree())
            .await
            .unwrap();

        assert!(paths.is_empty());
        assert_eq!(model.prompts().len(), 2);
    }
}
