use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::task::{RemoteTodo, Task};

/// A mutation to mirror to the remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Create(Task),
    Update(Task),
    Delete(u64),
}

impl RemoteOp {
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteOp::Create(_) => "create",
            RemoteOp::Update(_) => "update",
            RemoteOp::Delete(_) => "delete",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            RemoteOp::Create(task) | RemoteOp::Update(task) => task.id,
            RemoteOp::Delete(id) => *id,
        }
    }
}

/// Result of a best-effort remote call. Never rolled back into local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied,
    Rejected { status: u16 },
    Failed { reason: String },
}

impl RemoteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RemoteOutcome::Applied)
    }
}

impl fmt::Display for RemoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOutcome::Applied => f.write_str("applied"),
            RemoteOutcome::Rejected { status } => write!(f, "rejected with status {status}"),
            RemoteOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

pub trait Remote: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = anyhow::Result<Vec<RemoteTodo>>> + Send;

    fn send(&self, op: RemoteOp) -> impl Future<Output = RemoteOutcome> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// No timeout is applied unless one is given.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("failed building HTTP client for remote sync")?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: u64) -> String {
        format!("{}/todos/{id}", self.base_url)
    }

    async fn create(&self, task: &Task) -> anyhow::Result<RemoteOutcome> {
        let response = self
            .client
            .post(self.collection_url())
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(serde_json::to_string(task)?)
            .send()
            .await
            .context("failed sending create request")?;

        // Any JSON echo counts as success, whatever the status.
        let echoed: serde_json::Value = response
            .json()
            .await
            .context("failed decoding create response")?;
        debug!(%echoed, "remote echoed created task");
        Ok(RemoteOutcome::Applied)
    }

    async fn update(&self, task: &Task) -> anyhow::Result<RemoteOutcome> {
        let response = self
            .client
            .put(self.item_url(task.id))
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(serde_json::to_string(task)?)
            .send()
            .await
            .context("failed sending update request")?;
        Ok(outcome_for_status(response.status()))
    }

    async fn delete(&self, id: u64) -> anyhow::Result<RemoteOutcome> {
        let response = self
            .client
            .delete(self.item_url(id))
            .send()
            .await
            .context("failed sending delete request")?;
        Ok(outcome_for_status(response.status()))
    }
}

fn outcome_for_status(status: StatusCode) -> RemoteOutcome {
    if status == StatusCode::OK {
        RemoteOutcome::Applied
    } else {
        RemoteOutcome::Rejected {
            status: status.as_u16(),
        }
    }
}

impl Remote for HttpRemote {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_all(&self) -> anyhow::Result<Vec<RemoteTodo>> {
        let url = self.collection_url();
        let todos: Vec<RemoteTodo> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("remote refused {url}"))?
            .json()
            .await
            .with_context(|| format!("failed decoding todos from {url}"))?;

        debug!(count = todos.len(), "fetched remote todos");
        Ok(todos)
    }

    #[instrument(skip(self, op), fields(kind = op.kind(), id = op.id()))]
    async fn send(&self, op: RemoteOp) -> RemoteOutcome {
        let result = match &op {
            RemoteOp::Create(task) => self.create(task).await,
            RemoteOp::Update(task) => self.update(task).await,
            RemoteOp::Delete(id) => self.delete(*id).await,
        };
        result.unwrap_or_else(|err| RemoteOutcome::Failed {
            reason: format!("{err:#}"),
        })
    }
}

/// Used when `remote.enabled` is off: nothing is fetched and every call is
/// accepted without I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

impl Remote for OfflineRemote {
    async fn fetch_all(&self) -> anyhow::Result<Vec<RemoteTodo>> {
        Ok(vec![])
    }

    async fn send(&self, op: RemoteOp) -> RemoteOutcome {
        debug!(kind = op.kind(), id = op.id(), "remote disabled, skipping call");
        RemoteOutcome::Applied
    }
}

/// The remote chosen at startup from configuration.
#[derive(Debug, Clone)]
pub enum RemoteBridge {
    Http(HttpRemote),
    Offline(OfflineRemote),
}

impl RemoteBridge {
    #[instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        if !cfg.remote_enabled {
            info!("remote sync disabled");
            return Ok(RemoteBridge::Offline(OfflineRemote));
        }

        let timeout = cfg.remote_timeout;
        info!(base_url = %cfg.remote_url, ?timeout, "remote sync enabled");
        Ok(RemoteBridge::Http(HttpRemote::new(
            cfg.remote_url.as_str(),
            timeout,
        )?))
    }
}

impl Remote for RemoteBridge {
    async fn fetch_all(&self) -> anyhow::Result<Vec<RemoteTodo>> {
        match self {
            RemoteBridge::Http(remote) => remote.fetch_all().await,
            RemoteBridge::Offline(remote) => remote.fetch_all().await,
        }
    }

    async fn send(&self, op: RemoteOp) -> RemoteOutcome {
        match self {
            RemoteBridge::Http(remote) => remote.send(op).await,
            RemoteBridge::Offline(remote) => remote.send(op).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_REMOTE_URL;
    use crate::task::{Category, Stage};

    #[test]
    fn only_exact_ok_counts_as_applied() {
        assert_eq!(outcome_for_status(StatusCode::OK), RemoteOutcome::Applied);
        assert_eq!(
            outcome_for_status(StatusCode::NO_CONTENT),
            RemoteOutcome::Rejected { status: 204 }
        );
        assert_eq!(
            outcome_for_status(StatusCode::NOT_FOUND),
            RemoteOutcome::Rejected { status: 404 }
        );
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let remote = HttpRemote::new("https://example.test/api/", None).expect("client");
        assert_eq!(remote.collection_url(), "https://example.test/api/todos");
        assert_eq!(remote.item_url(7), "https://example.test/api/todos/7");
    }

    #[test]
    fn disabled_remote_goes_offline() {
        let mut cfg = Config::default();
        assert!(matches!(
            RemoteBridge::from_config(&cfg).expect("bridge"),
            RemoteBridge::Http(ref remote) if remote.base_url() == DEFAULT_REMOTE_URL
        ));

        cfg.remote_enabled = false;
        assert!(matches!(
            RemoteBridge::from_config(&cfg).expect("bridge"),
            RemoteBridge::Offline(_)
        ));
    }

    #[test]
    fn op_reports_kind_and_id() {
        let task = Task::new(3, "A", Category::Work, Stage::New);
        assert_eq!(RemoteOp::Create(task.clone()).kind(), "create");
        assert_eq!(RemoteOp::Update(task).id(), 3);
        assert_eq!(RemoteOp::Delete(9).id(), 9);
    }
}
