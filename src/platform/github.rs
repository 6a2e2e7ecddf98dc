//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::{HostingService, RetryPolicy};
use crate::types::{CommitState, CommitStatus, PullRequest, RepoId, ReviewComment};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Public GitHub API endpoint
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Page size for list endpoints
const PER_PAGE: u8 = 100;

// REST response types for endpoints octocrab does not cover

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Deserialize)]
struct RawReviewComment {
    user: Option<RawUser>,
    #[serde(default)]
    body: String,
    original_commit_id: Option<String>,
}

#[derive(Deserialize)]
struct RawStatus {
    state: String,
    #[serde(default)]
    context: String,
    description: Option<String>,
}

/// GitHub service using octocrab for pull requests and raw REST calls for
/// git data, merges and statuses
pub struct GitHubService {
    client: Octocrab,
    repo: RepoId,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API base URL without trailing slash
    api_url: String,
    /// Context name for statuses we create
    status_context: String,
    retry: RetryPolicy,
}

impl GitHubService {
    /// Create a new GitHub service bound to `repo`
    pub fn new(
        token: &str,
        repo: RepoId,
        api_url: Option<&str>,
        status_context: &str,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let api_url = api_url
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_url.as_str())
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("mergeq")
            .timeout(retry.timeout)
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            repo,
            token: token.to_string(),
            http_client,
            api_url,
            status_context: status_context.to_string(),
            retry,
        })
    }

    /// Build a request against `/repos/{owner}/{name}/{path}`
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/repos/{}/{}/{path}",
            self.api_url,
            urlencoding::encode(&self.repo.owner),
            urlencoding::encode(&self.repo.name)
        );
        self.http_client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn fetch_open_pulls(&self) -> Result<Vec<PullRequest>> {
        let page = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(PER_PAGE)
            .send()
            .await?;

        let pulls = self.client.all_pages(page).await?;
        Ok(pulls.iter().map(pr_from_octocrab).collect())
    }

    async fn fetch_pull(&self, number: u64) -> Result<PullRequest> {
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .get(number)
            .await?;
        Ok(pr_from_octocrab(&pr))
    }

    async fn fetch_review_comments(&self, number: u64) -> Result<Vec<ReviewComment>> {
        let mut comments = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .request(Method::GET, &format!("pulls/{number}/comments"))
                .query(&[("per_page", u32::from(PER_PAGE)), ("page", page)])
                .send()
                .await?;
            let batch: Vec<RawReviewComment> = check(response).await?.json().await?;
            let last_page = batch.len() < usize::from(PER_PAGE);

            comments.extend(batch.into_iter().map(|c| ReviewComment {
                author: c.user.map(|u| u.login).unwrap_or_default(),
                body: c.body,
                commit_id: c.original_commit_id,
            }));

            if last_page {
                return Ok(comments);
            }
            page += 1;
        }
    }

    async fn fetch_statuses(&self, sha: &str) -> Result<Vec<CommitStatus>> {
        let response = self
            .request(Method::GET, &format!("commits/{sha}/statuses"))
            .query(&[("per_page", PER_PAGE)])
            .send()
            .await?;
        let statuses: Vec<RawStatus> = check(response).await?.json().await?;

        Ok(statuses
            .into_iter()
            .map(|s| CommitStatus {
                state: s.state,
                context: s.context,
                description: s.description,
            })
            .collect())
    }

    async fn fetch_branch_head(&self, branch: &str) -> Result<String> {
        let response = self
            .request(Method::GET, &format!("git/ref/heads/{branch}"))
            .send()
            .await?;
        let reference: RefResponse = check(response).await?.json().await?;
        Ok(reference.object.sha)
    }

    async fn patch_ref(&self, branch: &str, sha: &str, force: bool) -> Result<()> {
        let response = self
            .request(Method::PATCH, &format!("git/refs/heads/{branch}"))
            .json(&json!({ "sha": sha, "force": force }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn post_ref(&self, branch: &str, sha: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "git/refs")
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn post_merge(&self, base: &str, head: &str, message: &str) -> Result<String> {
        let response = self
            .request(Method::POST, "merges")
            .json(&json!({ "base": base, "head": head, "commit_message": message }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Err(Error::Platform(format!(
                "nothing to merge: {head} is already contained in {base}"
            ))),
            StatusCode::CONFLICT => Err(Error::MergeConflict {
                base: base.to_string(),
                head: head.to_string(),
            }),
            _ => {
                let commit: CommitResponse = check(response).await?.json().await?;
                Ok(commit.sha)
            }
        }
    }

    async fn post_status(
        &self,
        sha: &str,
        state: CommitState,
        description: &str,
        target_url: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({
            "state": state.as_str(),
            "description": description,
            "context": self.status_context,
        });
        if let Some(url) = target_url {
            body["target_url"] = json!(url);
        }

        let response = self
            .request(Method::POST, &format!("statuses/{sha}"))
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Map a non-success response to an error, keeping the API's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        Err(Error::NotFound(message))
    } else {
        Err(Error::Http {
            status: status.as_u16(),
            message,
        })
    }
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        head_sha: pr.head.sha.clone(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl HostingService for GitHubService {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn list_open_pulls(&self) -> Result<Vec<PullRequest>> {
        debug!(repo = %self.repo, "listing open pull requests");
        let pulls = self
            .retry
            .run("list_open_pulls", || self.fetch_open_pulls())
            .await?;
        debug!(repo = %self.repo, count = pulls.len(), "listed open pull requests");
        Ok(pulls)
    }

    async fn get_pull(&self, number: u64) -> Result<PullRequest> {
        debug!(repo = %self.repo, pr = number, "getting pull request");
        self.retry.run("get_pull", || self.fetch_pull(number)).await
    }

    async fn list_review_comments(&self, number: u64) -> Result<Vec<ReviewComment>> {
        debug!(repo = %self.repo, pr = number, "listing review comments");
        self.retry
            .run("list_review_comments", || self.fetch_review_comments(number))
            .await
    }

    async fn list_statuses(&self, sha: &str) -> Result<Vec<CommitStatus>> {
        debug!(repo = %self.repo, sha, "listing commit statuses");
        self.retry
            .run("list_statuses", || self.fetch_statuses(sha))
            .await
    }

    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        debug!(repo = %self.repo, branch, "reading branch head");
        self.retry
            .run("get_branch_head", || self.fetch_branch_head(branch))
            .await
    }

    async fn update_branch(&self, branch: &str, sha: &str, force: bool) -> Result<()> {
        debug!(repo = %self.repo, branch, sha, force, "updating branch");
        self.retry
            .run("update_branch", || self.patch_ref(branch, sha, force))
            .await
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        debug!(repo = %self.repo, branch, sha, "creating branch");
        self.retry
            .run("create_branch", || self.post_ref(branch, sha))
            .await
    }

    async fn merge(&self, base: &str, head: &str, message: &str) -> Result<String> {
        debug!(repo = %self.repo, base, head, "creating merge commit");
        // A retry after a lost response would see "nothing to merge".
        let sha = self
            .retry
            .single_attempt()
            .run("merge", || self.post_merge(base, head, message))
            .await?;
        debug!(repo = %self.repo, merge_sha = %sha, "created merge commit");
        Ok(sha)
    }

    async fn create_status(
        &self,
        sha: &str,
        state: CommitState,
        description: &str,
        target_url: Option<&str>,
    ) -> Result<()> {
        debug!(repo = %self.repo, sha, %state, "creating commit status");
        self.retry
            .run("create_status", || {
                self.post_status(sha, state, description, target_url)
            })
            .await
    }
}
