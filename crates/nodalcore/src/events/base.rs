use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        queued_workflows: usize,
        timestamp: DateTime<Utc>,
    },
    WorkflowStarted {
        run_id: RunId,
        workflow_index: usize,
        name: Option<String>,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        run_id: RunId,
        workflow_index: usize,
        node_index: usize,
        node_name: String,
        entity: String,
        method: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        run_id: RunId,
        workflow_index: usize,
        node_index: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        workflow_index: usize,
        node_index: usize,
        error: String,
        /// Whether an error handler took the failure and the run went on
        recovered: bool,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    RunFaulted {
        run_id: RunId,
        error: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            ExecutionEvent::RunStarted { run_id, .. }
            | ExecutionEvent::WorkflowStarted { run_id, .. }
            | ExecutionEvent::NodeStarted { run_id, .. }
            | ExecutionEvent::NodeCompleted { run_id, .. }
            | ExecutionEvent::NodeFailed { run_id, .. }
            | ExecutionEvent::RunCompleted { run_id, .. }
            | ExecutionEvent::RunFaulted { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for run events
///
/// Emitting with no subscribers is a no-op.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
}
