//! Single-writer coordinator
//!
//! One task owns every repository's queue state. Webhook handlers, CI
//! callbacks and the periodic tick talk to it through a
//! [`CoordinatorHandle`]; requests are processed strictly one at a time, so
//! two drive passes can never interleave.

use crate::error::{Error, Result};
use crate::merge::{promote_candidate, report_failure};
use crate::queue::{
    BuildResult, BuildStatus, CommandContext, DriveReport, PullRequestState, TrackedRepo, drive,
    parse_commands,
};
use crate::types::CommitState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default capacity of the request channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// An inbound event for one repository (`repo` is `owner/name`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A comment was posted on a pull request
    Comment {
        /// Repository full name
        repo: String,
        /// PR number
        number: u64,
        /// Commenter login
        author: String,
        /// Comment body
        body: String,
        /// Commit the comment targets
        commit_id: Option<String>,
    },
    /// A pull request was opened or reopened
    PullOpened {
        /// Repository full name
        repo: String,
        /// PR number
        number: u64,
        /// Head commit
        head_commit: String,
    },
    /// New commits were pushed to a pull request
    PullSynchronized {
        /// Repository full name
        repo: String,
        /// PR number
        number: u64,
        /// New head commit
        head_commit: String,
    },
    /// A pull request was closed or merged
    PullClosed {
        /// Repository full name
        repo: String,
        /// PR number
        number: u64,
    },
    /// A builder reported on a trial merge
    BuildFinished {
        /// Repository full name
        repo: String,
        /// Trial merge commit the builder tested
        merge_commit: String,
        /// Builder name
        builder: String,
        /// Reported result
        result: BuildResult,
    },
}

enum Request {
    Event {
        event: Event,
        reply: oneshot::Sender<Result<Option<DriveReport>>>,
    },
    Drive {
        reply: oneshot::Sender<DriveReport>,
    },
    Snapshot {
        repo: String,
        reply: oneshot::Sender<Result<Vec<PullRequestState>>>,
    },
}

/// Cloneable handle to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Request>,
}

impl CoordinatorHandle {
    /// Run a drive pass over every repository and wait for it
    pub async fn drive_now(&self) -> Result<DriveReport> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Drive { reply }, rx).await
    }

    /// Apply an event; returns the drive report if it triggered a pass
    pub async fn send(&self, event: Event) -> Result<Option<DriveReport>> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Event { event, reply }, rx).await?
    }

    /// A review comment was posted
    pub async fn comment(
        &self,
        repo: &str,
        number: u64,
        author: &str,
        body: &str,
        commit_id: Option<&str>,
    ) -> Result<Option<DriveReport>> {
        self.send(Event::Comment {
            repo: repo.to_string(),
            number,
            author: author.to_string(),
            body: body.to_string(),
            commit_id: commit_id.map(str::to_string),
        })
        .await
    }

    /// A pull request was opened or reopened
    pub async fn pull_opened(
        &self,
        repo: &str,
        number: u64,
        head_commit: &str,
    ) -> Result<Option<DriveReport>> {
        self.send(Event::PullOpened {
            repo: repo.to_string(),
            number,
            head_commit: head_commit.to_string(),
        })
        .await
    }

    /// New commits were pushed to a pull request
    pub async fn pull_synchronized(
        &self,
        repo: &str,
        number: u64,
        head_commit: &str,
    ) -> Result<Option<DriveReport>> {
        self.send(Event::PullSynchronized {
            repo: repo.to_string(),
            number,
            head_commit: head_commit.to_string(),
        })
        .await
    }

    /// A pull request was closed or merged elsewhere
    pub async fn pull_closed(&self, repo: &str, number: u64) -> Result<Option<DriveReport>> {
        self.send(Event::PullClosed {
            repo: repo.to_string(),
            number,
        })
        .await
    }

    /// A builder reported on a trial merge
    pub async fn build_result(
        &self,
        repo: &str,
        merge_commit: &str,
        builder: &str,
        result: BuildResult,
    ) -> Result<Option<DriveReport>> {
        self.send(Event::BuildFinished {
            repo: repo.to_string(),
            merge_commit: merge_commit.to_string(),
            builder: builder.to_string(),
            result,
        })
        .await
    }

    /// Current states of a repository, in queue order
    pub async fn snapshot(&self, repo: &str) -> Result<Vec<PullRequestState>> {
        let (reply, rx) = oneshot::channel();
        let repo = repo.to_string();
        self.request(Request::Snapshot { repo, reply }, rx).await?
    }

    async fn request<T>(&self, request: Request, rx: oneshot::Receiver<T>) -> Result<T> {
        self.tx
            .send(request)
            .await
            .map_err(|_| Error::CoordinatorStopped)?;
        rx.await.map_err(|_| Error::CoordinatorStopped)
    }
}

/// Owner of all queue state
pub struct Coordinator {
    repos: Vec<TrackedRepo>,
}

impl Coordinator {
    /// Create a coordinator over already-loaded repositories
    pub fn new(repos: Vec<TrackedRepo>) -> Self {
        Self { repos }
    }

    /// Start the coordinator task
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(self, capacity: usize) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(self.run(rx));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(request) = rx.recv().await {
            match request {
                Request::Event { event, reply } => {
                    let result = self.handle_event(event).await;
                    let _ = reply.send(result);
                }
                Request::Drive { reply } => {
                    let report = self.drive().await;
                    let _ = reply.send(report);
                }
                Request::Snapshot { repo, reply } => {
                    let _ = reply.send(self.snapshot(&repo));
                }
            }
        }
        debug!("coordinator stopped");
    }

    /// Run one drive pass over every repository
    pub async fn drive(&mut self) -> DriveReport {
        let report = drive(&mut self.repos).await;
        debug!(started = report.started_count(), "drive pass complete");
        report
    }

    /// Current states of `repo`, in queue order
    pub fn snapshot(&self, repo: &str) -> Result<Vec<PullRequestState>> {
        let tracked = self
            .repos
            .iter()
            .find(|r| r.full_name() == repo)
            .ok_or_else(|| Error::UnknownRepository(repo.to_string()))?;

        Ok(tracked
            .queue
            .ordered_numbers()
            .into_iter()
            .filter_map(|n| tracked.queue.get(n).cloned())
            .collect())
    }

    /// Apply one event, driving the queue if the event calls for it
    pub async fn handle_event(&mut self, event: Event) -> Result<Option<DriveReport>> {
        let needs_drive = match event {
            Event::Comment {
                repo,
                number,
                author,
                body,
                commit_id,
            } => self.on_comment(&repo, number, &author, &body, commit_id.as_deref())?,
            Event::PullOpened {
                repo,
                number,
                head_commit,
            } => {
                let tracked = self.repo_mut(&repo)?;
                if tracked
                    .queue
                    .insert(PullRequestState::new(number, head_commit, BuildStatus::Untested))
                {
                    info!(repo = %repo, pr = number, "tracking pull request");
                }
                false
            }
            Event::PullSynchronized {
                repo,
                number,
                head_commit,
            } => self.on_synchronized(&repo, number, head_commit)?,
            Event::PullClosed { repo, number } => {
                let tracked = self.repo_mut(&repo)?;
                let removed = tracked.queue.remove(number);
                if removed.is_some() {
                    info!(repo = %repo, pr = number, "stopped tracking pull request");
                }
                removed.is_some_and(|s| s.status == BuildStatus::Testing)
            }
            Event::BuildFinished {
                repo,
                merge_commit,
                builder,
                result,
            } => {
                self.on_build_result(&repo, &merge_commit, &builder, result)
                    .await?
            }
        };

        if needs_drive {
            Ok(Some(self.drive().await))
        } else {
            Ok(None)
        }
    }

    fn repo_mut(&mut self, repo: &str) -> Result<&mut TrackedRepo> {
        self.repos
            .iter_mut()
            .find(|r| r.full_name() == repo)
            .ok_or_else(|| Error::UnknownRepository(repo.to_string()))
    }

    fn on_comment(
        &mut self,
        repo: &str,
        number: u64,
        author: &str,
        body: &str,
        commit_id: Option<&str>,
    ) -> Result<bool> {
        let tracked = self.repo_mut(repo)?;
        let authorized = tracked.config.is_reviewer(author);
        let state = tracked
            .queue
            .get_mut(number)
            .ok_or_else(|| Error::UnknownPullRequest {
                repo: repo.to_string(),
                number,
            })?;

        if !authorized {
            debug!(repo, pr = number, author, "ignoring comment from non-reviewer");
            return Ok(false);
        }
        if commit_id != Some(state.head_commit.as_str()) {
            debug!(
                repo,
                pr = number,
                author,
                head = %state.head_commit,
                commit = ?commit_id,
                "ignoring comment not made on the current head"
            );
            return Ok(false);
        }

        if !parse_commands(body, author, state, CommandContext::Live) {
            return Ok(false);
        }

        info!(repo, pr = number, author, %state, "reviewer command applied");
        if let Some(hold) = tracked.queue.release(number) {
            info!(repo, pr = number, reason = %hold.reason, "released hold");
        }
        Ok(true)
    }

    fn on_synchronized(&mut self, repo: &str, number: u64, head_commit: String) -> Result<bool> {
        let tracked = self.repo_mut(repo)?;
        let state = tracked
            .queue
            .get_mut(number)
            .ok_or_else(|| Error::UnknownPullRequest {
                repo: repo.to_string(),
                number,
            })?;

        let was_testing = state.status == BuildStatus::Testing;
        let old_head = state.head_commit.clone();
        if !state.sync_head(head_commit) {
            return Ok(false);
        }

        info!(
            repo,
            pr = number,
            old_head = %old_head,
            new_head = %state.head_commit,
            "head moved, resetting approval and build state"
        );
        tracked.queue.release(number);
        Ok(was_testing)
    }

    async fn on_build_result(
        &mut self,
        repo: &str,
        merge_commit: &str,
        builder: &str,
        result: BuildResult,
    ) -> Result<bool> {
        let tracked = self.repo_mut(repo)?;
        let Some(state) = tracked.queue.states_mut().find(|s| {
            s.status == BuildStatus::Testing && s.merge_commit.as_deref() == Some(merge_commit)
        }) else {
            debug!(repo, merge_sha = merge_commit, builder, "no change testing this commit");
            return Ok(false);
        };

        if !state.record_build_result(builder, result) {
            warn!(repo, pr = state.number, builder, "result from unexpected builder ignored");
            return Ok(false);
        }
        debug!(repo, pr = state.number, builder, ?result, "recorded build result");

        let Some(verdict) = state.build_verdict() else {
            return Ok(false);
        };
        state.status = verdict;
        let elapsed_secs = state
            .testing_since
            .map(|since| (chrono::Utc::now() - since).num_seconds());
        info!(repo, pr = state.number, %verdict, ?elapsed_secs, "build finished");

        let service = tracked.service.as_ref();
        let reported = match verdict {
            BuildStatus::Success => promote_candidate(service, &tracked.config, state).await,
            _ => report_failure(service, state).await,
        };

        if let Err(e) = reported {
            error!(repo, pr = state.number, error = %e, "failed to finish build");
            if verdict == BuildStatus::Success {
                state.status = BuildStatus::Failure;
                let description = format!("Promotion failed: {e}");
                if let Err(e) = service
                    .create_status(&state.head_commit, CommitState::Error, &description, None)
                    .await
                {
                    warn!(repo, pr = state.number, error = %e, "failed to report promotion error");
                }
            }
        }

        Ok(true)
    }
}
