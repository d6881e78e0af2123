//! Marker-based idempotent report publishing.
//!
//! Every published report body starts with a hidden HTML marker derived
//! from the working directory, so a rerun finds its own previous comment
//! and updates it in place — one upsert per run, never an append per run.
//! The digest keeps reports from different working directories (monorepo
//! setups) from clobbering each other.

use crate::client::{GithubClient, IssueComment};
use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::info;

/// Hidden identity marker for an upserted report comment.
pub fn report_marker(working_directory: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(working_directory.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("<!-- covgate:{} -->", &digest[..12])
}

/// Find the comment carrying the given marker, if any.
pub fn find_marked_comment<'a>(
    comments: &'a [IssueComment],
    marker: &str,
) -> Option<&'a IssueComment> {
    comments.iter().find(|c| c.body.contains(marker))
}

/// Where a report can be published. The pipeline driver only sees this
/// trait, so tests can substitute a recording fake.
#[async_trait]
pub trait PublishTarget: Send + Sync {
    /// Create or update the single marked comment on a pull request.
    async fn upsert_pr_comment(&self, pr_number: u64, marker: &str, text: &str) -> Result<()>;

    /// Comment on a commit (non-PR runs).
    async fn post_commit_comment(&self, sha: &str, marker: &str, text: &str) -> Result<()>;
}

#[async_trait]
impl PublishTarget for GithubClient {
    async fn upsert_pr_comment(&self, pr_number: u64, marker: &str, text: &str) -> Result<()> {
        let body = format!("{}\n{}", marker, text);
        let comments = self.list_issue_comments(pr_number).await?;

        match find_marked_comment(&comments, marker) {
            Some(existing) => {
                info!(pr = pr_number, comment_id = existing.id, "updating report comment");
                self.update_issue_comment(existing.id, &body).await
            }
            None => {
                info!(pr = pr_number, "creating report comment");
                self.create_issue_comment(pr_number, &body).await
            }
        }
    }

    async fn post_commit_comment(&self, sha: &str, marker: &str, text: &str) -> Result<()> {
        let body = format!("{}\n{}", marker, text);
        info!(sha = %sha, "creating commit report comment");
        self.create_commit_comment(sha, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_stable() {
        assert_eq!(report_marker("pkg/api"), report_marker("pkg/api"));
    }

    #[test]
    fn test_marker_distinguishes_working_directories() {
        assert_ne!(report_marker("pkg/api"), report_marker("pkg/web"));
    }

    #[test]
    fn test_marker_is_hidden_html_comment() {
        let marker = report_marker(".");
        assert!(marker.starts_with("<!-- covgate:"));
        assert!(marker.ends_with(" -->"));
    }

    #[test]
    fn test_find_marked_comment() {
        let marker = report_marker(".");
        let comments = vec![
            IssueComment {
                id: 1,
                body: "unrelated".to_string(),
            },
            IssueComment {
                id: 2,
                body: format!("{}\n# Coverage report", marker),
            },
        ];

        let found = find_marked_comment(&comments, &marker).expect("marked comment not found");
        assert_eq!(found.id, 2);

        assert!(find_marked_comment(&comments[..1], &marker).is_none());
    }
}
