use std::mem;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::datastore::DataStore;
use crate::remote::{Remote, RemoteOp, RemoteOutcome};
use crate::store::TaskStore;
use crate::task::{Category, Stage};
use crate::view::CategoryView;

/// A user interaction, with its parameters already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectTab(Category),
    Submit(NewTaskForm),
    Edit { id: u64, text: String },
    SetStage { id: u64, stage: Stage },
    Remove { id: u64 },
}

/// Creation form state. `Default` is the state the form resets to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTaskForm {
    pub text: String,
    pub category: Category,
    pub stage: Stage,
}

impl NewTaskForm {
    pub fn new(text: impl Into<String>, category: Category, stage: Stage) -> Self {
        Self {
            text: text.into(),
            category,
            stage,
        }
    }
}

/// Category tabs; exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tabs {
    active: Category,
}

impl Tabs {
    pub fn new(active: Category) -> Self {
        Self { active }
    }

    pub fn active(&self) -> Category {
        self.active
    }

    pub fn select(&mut self, category: Category) {
        self.active = category;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, bool)> + '_ {
        Category::ALL
            .into_iter()
            .map(|category| (category, category == self.active))
    }
}

/// A spawned remote call, labelled for logging while it is awaited.
struct InFlight {
    kind: &'static str,
    id: u64,
    handle: JoinHandle<RemoteOutcome>,
}

pub struct Controller<R: Remote> {
    store: TaskStore,
    datastore: DataStore,
    remote: Arc<R>,
    tabs: Tabs,
    form: NewTaskForm,
    in_flight: Vec<InFlight>,
}

impl<R: Remote> Controller<R> {
    /// Loads the persisted list, or imports from the remote and persists the
    /// import when nothing is stored yet.
    #[instrument(skip_all)]
    pub async fn init(datastore: DataStore, remote: R) -> anyhow::Result<Self> {
        let store = match datastore.load_tasks()? {
            Some(tasks) => {
                info!(count = tasks.len(), "loaded tasks from local storage");
                TaskStore::new(tasks)
            }
            None => {
                let todos = match remote.fetch_all().await {
                    Ok(todos) => todos,
                    Err(err) => {
                        error!(error = %format!("{err:#}"), "error fetching tasks");
                        vec![]
                    }
                };
                let store = TaskStore::from_remote(todos);
                datastore
                    .save_tasks(store.tasks())
                    .context("failed to persist imported tasks")?;
                info!(count = store.len(), "imported tasks from remote");
                store
            }
        };

        let tabs = Tabs::new(datastore.get_active_tab()?.unwrap_or_default());

        Ok(Self {
            store,
            datastore,
            remote: Arc::new(remote),
            tabs,
            form: NewTaskForm::default(),
            in_flight: vec![],
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn datastore(&self) -> &DataStore {
        &self.datastore
    }

    pub fn tabs(&self) -> &Tabs {
        &self.tabs
    }

    pub fn form(&self) -> &NewTaskForm {
        &self.form
    }

    pub fn render(&self) -> CategoryView {
        CategoryView::build(&self.store, self.tabs.active())
    }

    /// Applies one action and returns the re-rendered active tab. Must run
    /// inside a tokio runtime; remote calls are spawned, not awaited.
    #[instrument(skip(self))]
    pub fn handle(&mut self, action: Action) -> anyhow::Result<CategoryView> {
        let op = match action {
            Action::SelectTab(category) => {
                self.tabs.select(category);
                self.datastore.set_active_tab(category)?;
                None
            }
            Action::Submit(form) => {
                self.form = form;
                let op = self
                    .store
                    .add(&self.form.text, self.form.category, self.form.stage);
                if op.is_some() {
                    let submitted = mem::take(&mut self.form);
                    debug!(?submitted, "form submitted and reset");
                }
                op
            }
            Action::Edit { id, text } => self.store.edit(id, &text),
            Action::SetStage { id, stage } => self.store.set_stage(id, stage),
            Action::Remove { id } => self.store.remove(id),
        };

        if let Some(op) = op {
            self.datastore.save_tasks(self.store.tasks())?;
            self.dispatch(op);
        }

        Ok(self.render())
    }

    fn dispatch(&mut self, op: RemoteOp) {
        self.in_flight.retain(|call| !call.handle.is_finished());

        let kind = op.kind();
        let id = op.id();
        let remote = Arc::clone(&self.remote);
        let handle = tokio::spawn(async move {
            let outcome = remote.send(op).await;
            log_outcome(kind, id, &outcome);
            outcome
        });
        self.in_flight.push(InFlight { kind, id, handle });
    }

    /// Remote calls that have not answered yet, as `(kind, id)`, oldest first.
    pub fn pending_calls(&self) -> Vec<(&'static str, u64)> {
        self.in_flight
            .iter()
            .filter(|call| !call.handle.is_finished())
            .map(|call| (call.kind, call.id))
            .collect()
    }

    /// Waits for every remote call still in flight. Without `remote.timeout`
    /// a call that never answers keeps this waiting.
    #[instrument(skip(self), fields(tracked = self.in_flight.len()))]
    pub async fn settle(&mut self) -> Vec<RemoteOutcome> {
        let pending = self.pending_calls();
        if !pending.is_empty() {
            info!(?pending, "waiting for remote calls to answer");
        }

        let mut outcomes = Vec::with_capacity(self.in_flight.len());
        for InFlight { handle, .. } in self.in_flight.drain(..) {
            let outcome = handle.await.unwrap_or_else(|err| {
                warn!(error = %err, "remote call task did not complete");
                RemoteOutcome::Failed {
                    reason: err.to_string(),
                }
            });
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn log_outcome(kind: &str, id: u64, outcome: &RemoteOutcome) {
    if outcome.is_applied() {
        debug!(kind, id, "remote call applied");
    } else {
        warn!(kind, id, %outcome, "remote call did not apply");
    }
}
