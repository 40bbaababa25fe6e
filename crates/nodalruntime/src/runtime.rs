use crate::{executor::NodeDispatcher, registry::EntityRegistry};
use chrono::Utc;
use nodalcore::{
    Entity, EventBus, ExecutionEvent, FlowError, Node, NodeError, RunId, StateTable, Workflow,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// Upper bound for a single node; `None` lets a node run forever
    pub node_timeout: Option<Duration>,
}

impl RuntimeConfig {
    pub fn with_node_timeout(mut self, limit: Duration) -> Self {
        self.node_timeout = Some(limit);
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            node_timeout: None,
        }
    }
}

/// Construction options: the full entity set plus runtime configuration
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    pub entities: Vec<Entity>,
    pub config: RuntimeConfig,
}

impl RunnerOptions {
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities.into_iter().collect(),
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }
}

pub type ErrorHandler = Box<dyn FnMut(&NodeError, &Node) + Send>;
pub type CompletionHandler = Box<dyn FnOnce() + Send>;

/// Callbacks for a single run
#[derive(Default)]
pub struct RunOptions {
    on_error: Option<ErrorHandler>,
    on_completed: Option<CompletionHandler>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recover from node failures: the handler sees the error and the run moves on
    pub fn on_error(mut self, handler: impl FnMut(&NodeError, &Node) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Fires once, after every queued workflow has finished
    pub fn on_completed(mut self, handler: impl FnOnce() + Send + 'static) -> Self {
        self.on_completed = Some(Box::new(handler));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Faulted,
}

/// Where the runner is in the workflow queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunPosition {
    pub workflow_index: usize,
    pub node_index: usize,
}

/// Mutable run state, owned by the runner
#[derive(Debug)]
struct RunContext {
    status: RunStatus,
    position: RunPosition,
    /// Bumped by every run and reset; a task whose generation is stale stops quietly
    generation: u64,
    cancellation: Option<CancellationToken>,
}

enum Progress {
    Finished,
    Superseded,
}

struct RunnerInner {
    dispatcher: NodeDispatcher,
    queue: RwLock<Vec<Arc<Workflow>>>,
    context: Mutex<RunContext>,
    /// Shared with in-flight nodes; writers copy only while a node still holds it
    state: RwLock<Arc<StateTable>>,
    events: EventBus,
}

/// Sequential workflow runner
///
/// Cloning is cheap and every clone drives the same runner, so callbacks can
/// hold one to queue more workflows or read the state mid-run.
#[derive(Clone)]
pub struct NodalRunner {
    inner: Arc<RunnerInner>,
}

impl NodalRunner {
    pub fn new(options: RunnerOptions) -> Self {
        let registry = EntityRegistry::with_entities(options.entities);
        let dispatcher = NodeDispatcher::new(registry, options.config.node_timeout);

        Self {
            inner: Arc::new(RunnerInner {
                dispatcher,
                queue: RwLock::new(Vec::new()),
                context: Mutex::new(RunContext {
                    status: RunStatus::Idle,
                    position: RunPosition::default(),
                    generation: 0,
                    cancellation: None,
                }),
                state: RwLock::new(Arc::new(StateTable::new())),
                events: EventBus::new(options.config.event_buffer_size),
            }),
        }
    }

    /// Queue a workflow; node references are not checked until they run
    pub fn add_workflow(&self, workflow: impl Into<Workflow>) -> &Self {
        let workflow = workflow.into();
        tracing::debug!("Queued workflow '{}' ({} nodes)", workflow.label(), workflow.len());
        write(&self.inner.queue).push(Arc::new(workflow));
        self
    }

    /// Start executing the queue on a background task
    ///
    /// Must be called from within a Tokio runtime. Fails without touching the
    /// in-progress run when one is already active.
    pub fn run(&self, options: RunOptions) -> Result<RunHandle, FlowError> {
        let runtime = Handle::try_current().map_err(|_| FlowError::NoRuntime)?;
        let (generation, cancellation) = {
            let mut ctx = lock(&self.inner.context);
            if ctx.status == RunStatus::Running {
                return Err(FlowError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            ctx.status = RunStatus::Running;
            ctx.generation += 1;
            ctx.cancellation = Some(token.clone());
            (ctx.generation, token)
        };

        let run_id = RunId::new_v4();
        let runner = self.clone();
        let token = cancellation.clone();
        let task = runtime.spawn(async move {
            runner.execute_run(run_id, generation, options, token).await
        });

        Ok(RunHandle {
            run_id,
            task,
            cancellation,
        })
    }

    /// Snapshot of every result recorded so far
    pub fn current_state(&self) -> StateTable {
        self.snapshot().as_ref().clone()
    }

    /// Return to idle, rewind to the start of the queue and drop all results
    ///
    /// The registry and the queue are kept. An in-flight run is cancelled and
    /// discards whatever its current node returns.
    pub fn reset(&self) -> &Self {
        let mut ctx = lock(&self.inner.context);
        ctx.generation += 1;
        ctx.status = RunStatus::Idle;
        ctx.position = RunPosition::default();
        if let Some(token) = ctx.cancellation.take() {
            token.cancel();
        }
        *write(&self.inner.state) = Arc::new(StateTable::new());
        tracing::info!("Runner reset");
        self
    }

    pub fn status(&self) -> RunStatus {
        lock(&self.inner.context).status
    }

    pub fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    pub fn position(&self) -> RunPosition {
        lock(&self.inner.context).position
    }

    pub fn workflow_count(&self) -> usize {
        read(&self.inner.queue).len()
    }

    pub fn registry(&self) -> &EntityRegistry {
        self.inner.dispatcher.registry()
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.inner.events.subscribe()
    }

    async fn execute_run(
        self,
        run_id: RunId,
        generation: u64,
        mut options: RunOptions,
        cancellation: CancellationToken,
    ) -> Result<(), FlowError> {
        let mut guard = RunGuard {
            runner: &self,
            generation,
            armed: true,
        };
        let start = Instant::now();

        tracing::info!(
            "Starting run {} ({} workflows queued)",
            run_id,
            self.workflow_count()
        );
        self.inner.events.emit(ExecutionEvent::RunStarted {
            run_id,
            queued_workflows: self.workflow_count(),
            timestamp: Utc::now(),
        });

        let outcome = self
            .execute_workflows(run_id, generation, &mut options, &cancellation)
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;
        guard.armed = false;

        match outcome {
            Ok(Progress::Finished) => {
                if !self.finish(generation, RunStatus::Idle) {
                    return Ok(());
                }
                tracing::info!("Run {} completed in {}ms", run_id, duration_ms);
                self.inner.events.emit(ExecutionEvent::RunCompleted {
                    run_id,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                if let Some(on_completed) = options.on_completed.take() {
                    on_completed();
                }
                Ok(())
            }
            Ok(Progress::Superseded) => {
                tracing::info!("Run {} abandoned after reset", run_id);
                Ok(())
            }
            Err(error) => {
                if !self.finish(generation, RunStatus::Faulted) {
                    tracing::info!("Run {} abandoned after reset", run_id);
                    return Ok(());
                }
                tracing::error!("Run {} failed: {}", run_id, error);
                self.inner.events.emit(ExecutionEvent::RunFaulted {
                    run_id,
                    error: error.to_string(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                Err(error)
            }
        }
    }

    async fn execute_workflows(
        &self,
        run_id: RunId,
        generation: u64,
        options: &mut RunOptions,
        cancellation: &CancellationToken,
    ) -> Result<Progress, FlowError> {
        loop {
            let Some(position) = self.position_if_current(generation) else {
                return Ok(Progress::Superseded);
            };
            // Re-read the queue each time: callbacks may append mid-run
            let Some(workflow) = self.workflow_at(position.workflow_index) else {
                return Ok(Progress::Finished);
            };
            let workflow_index = position.workflow_index;

            // A resumed workflow starts from a fresh entry too; earlier results are dropped
            let begun = self.commit(generation, |state, _| state.begin_workflow(workflow_index));
            if !begun {
                return Ok(Progress::Superseded);
            }
            tracing::info!(
                "Starting workflow {} '{}' at node {} ({} nodes)",
                workflow_index,
                workflow.label(),
                position.node_index,
                workflow.len()
            );
            self.inner.events.emit(ExecutionEvent::WorkflowStarted {
                run_id,
                workflow_index,
                name: workflow.name.clone(),
                timestamp: Utc::now(),
            });

            let progress = self
                .execute_workflow(run_id, generation, workflow_index, &workflow, options, cancellation)
                .await?;
            if let Progress::Superseded = progress {
                return Ok(Progress::Superseded);
            }

            let advanced = self.commit(generation, |_, ctx| {
                ctx.position.workflow_index += 1;
                ctx.position.node_index = 0;
            });
            if !advanced {
                return Ok(Progress::Superseded);
            }
        }
    }

    async fn execute_workflow(
        &self,
        run_id: RunId,
        generation: u64,
        workflow_index: usize,
        workflow: &Workflow,
        options: &mut RunOptions,
        cancellation: &CancellationToken,
    ) -> Result<Progress, FlowError> {
        loop {
            let Some(position) = self.position_if_current(generation) else {
                return Ok(Progress::Superseded);
            };
            let node_index = position.node_index;
            let Some(node) = workflow.nodes.get(node_index) else {
                return Ok(Progress::Finished);
            };

            self.inner.events.emit(ExecutionEvent::NodeStarted {
                run_id,
                workflow_index,
                node_index,
                node_name: node.name.clone(),
                entity: node.entity.clone(),
                method: node.method.clone(),
                timestamp: Utc::now(),
            });

            let snapshot = self.snapshot();
            let start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancellation.cancelled() => None,
                result = self.inner.dispatcher.execute(node, &snapshot) => Some(result),
            };
            drop(snapshot);

            let Some(result) = result else {
                if self.position_if_current(generation).is_none() {
                    return Ok(Progress::Superseded);
                }
                tracing::warn!("Run {} cancelled at node '{}'", run_id, node.name);
                return Err(FlowError::Cancelled);
            };

            match result {
                Ok(value) => {
                    let stored = self.commit(generation, |state, ctx| {
                        state.write(workflow_index, node_index, value);
                        ctx.position.node_index += 1;
                    });
                    if !stored {
                        return Ok(Progress::Superseded);
                    }
                    self.inner.events.emit(ExecutionEvent::NodeCompleted {
                        run_id,
                        workflow_index,
                        node_index,
                        duration_ms: start.elapsed().as_millis() as u64,
                        timestamp: Utc::now(),
                    });
                }
                Err(error) => {
                    let recovered = options.on_error.is_some();
                    self.inner.events.emit(ExecutionEvent::NodeFailed {
                        run_id,
                        workflow_index,
                        node_index,
                        error: error.to_string(),
                        recovered,
                        timestamp: Utc::now(),
                    });

                    let Some(on_error) = options.on_error.as_mut() else {
                        tracing::error!("Node '{}' failed: {}", node.name, error);
                        return Err(FlowError::Node(error));
                    };
                    tracing::warn!("Node '{}' failed, continuing: {}", node.name, error);
                    on_error(&error, node);

                    if !self.commit(generation, |_, ctx| ctx.position.node_index += 1) {
                        return Ok(Progress::Superseded);
                    }
                }
            }
        }
    }

    fn snapshot(&self) -> Arc<StateTable> {
        read(&self.inner.state).clone()
    }

    fn workflow_at(&self, index: usize) -> Option<Arc<Workflow>> {
        read(&self.inner.queue).get(index).cloned()
    }

    fn position_if_current(&self, generation: u64) -> Option<RunPosition> {
        let ctx = lock(&self.inner.context);
        (ctx.generation == generation).then_some(ctx.position)
    }

    /// Apply a state/position update if the run has not been superseded by a reset
    fn commit(
        &self,
        generation: u64,
        update: impl FnOnce(&mut StateTable, &mut RunContext),
    ) -> bool {
        let mut ctx = lock(&self.inner.context);
        if ctx.generation != generation {
            return false;
        }
        let mut state = write(&self.inner.state);
        update(Arc::make_mut(&mut *state), &mut *ctx);
        true
    }

    fn finish(&self, generation: u64, status: RunStatus) -> bool {
        let mut ctx = lock(&self.inner.context);
        if ctx.generation != generation {
            return false;
        }
        ctx.status = status;
        ctx.cancellation = None;
        true
    }
}

/// Handle to a run started with [`NodalRunner::run`]
///
/// Dropping the handle does not stop the run.
pub struct RunHandle {
    run_id: RunId,
    task: JoinHandle<Result<(), FlowError>>,
    cancellation: CancellationToken,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Stop the run at the node currently executing
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end and return its outcome
    pub async fn wait(self) -> Result<(), FlowError> {
        self.task
            .await
            .map_err(|e| FlowError::Join(e.to_string()))?
    }
}

/// Marks the run faulted if its task unwinds before finishing normally
struct RunGuard<'a> {
    runner: &'a NodalRunner,
    generation: u64,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.runner.finish(self.generation, RunStatus::Faulted);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
