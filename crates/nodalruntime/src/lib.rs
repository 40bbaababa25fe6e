//! Workflow execution runtime
//!
//! This crate provides the engine that runs queued workflows node by node,
//! the entity registry nodes are resolved against, and the run lifecycle.

mod executor;
mod registry;
mod runtime;

pub use executor::NodeDispatcher;
pub use registry::EntityRegistry;
pub use runtime::{
    CompletionHandler, ErrorHandler, NodalRunner, RunHandle, RunOptions, RunPosition, RunStatus,
    RunnerOptions, RuntimeConfig,
};
