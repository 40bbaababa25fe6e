//! Core abstractions for the nodal runner
//!
//! This crate provides the data model (entities, nodes, workflows, the state
//! table) and the error types that the runtime and entity library build on.

mod entity;
mod error;
pub mod events;
mod state;
mod value;
mod workflow;

pub use entity::{Entity, FnMethod, Method};
pub use error::{FlowError, MethodError, NodeError};
pub use events::*;
pub use state::{FieldRef, PathSegment, StateTable};
pub use value::Value;
pub use workflow::{Node, Parameters, Workflow};

/// Result type for run operations
pub type Result<T> = std::result::Result<T, FlowError>;
