//! covgate-github - GitHub publish collaborator
//!
//! Publishes the assembled coverage report back to GitHub:
//! - As an upserted pull-request comment (one marked comment per run
//!   identity, updated in place on reruns)
//! - As a commit comment when not running against a pull request

pub mod client;
pub mod publish;

// Re-export key types
pub use client::{GithubClient, IssueComment};
pub use publish::{find_marked_comment, report_marker, PublishTarget};
