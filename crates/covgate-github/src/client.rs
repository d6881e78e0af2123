//! Thin GitHub REST client for comment operations.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const PAGE_SIZE: u32 = 100;

/// An issue (or pull request) comment as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
}

/// GitHub REST client scoped to one repository.
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    repo: String,
    token: String,
}

impl GithubClient {
    /// `repo` is the `owner/name` pair; `api_base` is usually
    /// `https://api.github.com` but GitHub Enterprise hosts differ.
    pub fn new(api_base: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("covgate/", env!("CARGO_PKG_VERSION")))
    }

    /// List every comment on a pull request, following pagination.
    pub async fn list_issue_comments(&self, pr_number: u64) -> Result<Vec<IssueComment>> {
        let mut comments = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/repos/{}/issues/{}/comments?per_page={}&page={}",
                self.api_base, self.repo, pr_number, PAGE_SIZE, page
            );
            debug!(url = %url, "listing PR comments");

            let batch: Vec<IssueComment> = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .context("listing PR comments failed")?
                .error_for_status()
                .context("listing PR comments rejected")?
                .json()
                .await
                .context("decoding PR comments failed")?;

            let last_page = (batch.len() as u32) < PAGE_SIZE;
            comments.extend(batch);
            if last_page {
                return Ok(comments);
            }
            page += 1;
        }
    }

    /// Create a new comment on a pull request.
    pub async fn create_issue_comment(&self, pr_number: u64, body: &str) -> Result<()> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            self.api_base, self.repo, pr_number
        );
        self.request(reqwest::Method::POST, url)
            .json(&json!({ "body": body }))
            .send()
            .await
            .context("creating PR comment failed")?
            .error_for_status()
            .context("creating PR comment rejected")?;
        Ok(())
    }

    /// Replace the body of an existing comment.
    pub async fn update_issue_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        let url = format!(
            "{}/repos/{}/issues/comments/{}",
            self.api_base, self.repo, comment_id
        );
        self.request(reqwest::Method::PATCH, url)
            .json(&json!({ "body": body }))
            .send()
            .await
            .context("updating PR comment failed")?
            .error_for_status()
            .context("updating PR comment rejected")?;
        Ok(())
    }

    /// Comment on a specific commit (non-PR runs).
    pub async fn create_commit_comment(&self, sha: &str, body: &str) -> Result<()> {
        let url = format!(
            "{}/repos/{}/commits/{}/comments",
            self.api_base, self.repo, sha
        );
        self.request(reqwest::Method::POST, url)
            .json(&json!({ "body": body }))
            .send()
            .await
            .context("creating commit comment failed")?
            .error_for_status()
            .context("creating commit comment rejected")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let client = GithubClient::new("https://api.github.com/", "octo/repo", "t0k3n");
        assert_eq!(client.api_base, "https://api.github.com");
    }

    #[test]
    fn test_comment_body_defaults_empty() {
        let comment: IssueComment = serde_json::from_str(r#"{ "id": 7 }"#).expect("parse failed");
        assert_eq!(comment.id, 7);
        assert_eq!(comment.body, "");
    }
}
