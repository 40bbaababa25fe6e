// crates/nodalcore/src/events/mod.rs

mod base;

pub use base::{EventBus, ExecutionEvent, RunId};
