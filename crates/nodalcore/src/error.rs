use thiserror::Error;

/// Run-level failures surfaced from `run()` or its handle
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("Nodal runner is already running")]
    AlreadyRunning,

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Run task failed: {0}")]
    Join(String),

    #[error("No Tokio runtime available to drive the run")]
    NoRuntime,
}

/// Failure of a single node, routed through the run's error handler
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Entity '{entity}' not found")]
    EntityNotFound { entity: String },

    #[error("Method '{method}' not found in entity '{entity}'")]
    MethodNotFound { entity: String, method: String },

    #[error("{entity}.{method} failed: {source}")]
    Execution {
        entity: String,
        method: String,
        #[source]
        source: MethodError,
    },

    #[error("{entity}.{method} timed out after {millis}ms")]
    Timeout {
        entity: String,
        method: String,
        millis: u64,
    },
}

impl NodeError {
    /// True for unresolved entity or method references
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NodeError::EntityNotFound { .. } | NodeError::MethodNotFound { .. }
        )
    }
}

/// Error raised by an entity method
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MethodError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter type for '{field}': expected {expected}, got {actual}")]
    InvalidParameterType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}
