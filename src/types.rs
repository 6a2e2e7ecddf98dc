//! Core types for mergeq

use serde::{Deserialize, Serialize};

/// Repository identity on the hosting provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoId {
    /// Create a new repository identity
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name` form, used as the registry key
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// An open pull request as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Current head commit sha
    pub head_sha: String,
    /// PR title
    pub title: String,
}

/// A review comment on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Login of the commenter
    pub author: String,
    /// Comment body text
    pub body: String,
    /// Commit the comment was originally made against
    pub commit_id: Option<String>,
}

/// State of a commit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    /// Build in progress
    Pending,
    /// Build passed
    Success,
    /// Build failed
    Failure,
    /// Build could not run
    Error,
}

impl CommitState {
    /// Parse the provider's wire value; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Wire value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A commit status entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    /// Raw state string as reported (may be a value we do not model)
    pub state: String,
    /// Status context (the reporter's name)
    pub context: String,
    /// Human-readable description
    pub description: Option<String>,
}

impl CommitStatus {
    /// Parsed state, `None` for unrecognized values
    pub fn commit_state(&self) -> Option<CommitState> {
        CommitState::parse(&self.state)
    }
}

/// Shorten a commit sha for display and commit messages
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
