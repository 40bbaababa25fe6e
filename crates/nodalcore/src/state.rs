use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Results of every executed node, keyed by workflow index then node index
///
/// Writes are positional: a node that failed leaves an empty slot instead of
/// shifting the results of the nodes after it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTable {
    workflows: BTreeMap<usize, Vec<Option<Value>>>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty result sequence for a workflow
    pub fn begin_workflow(&mut self, workflow: usize) {
        self.workflows.insert(workflow, Vec::new());
    }

    /// Store a node result at its exact position
    pub fn write(&mut self, workflow: usize, node: usize, result: Value) {
        let slots = self.workflows.entry(workflow).or_default();
        if slots.len() <= node {
            slots.resize(node + 1, None);
        }
        slots[node] = Some(result);
    }

    /// Result slots of one workflow, `None` where a node produced nothing
    pub fn workflow(&self, workflow: usize) -> Option<&[Option<Value>]> {
        self.workflows.get(&workflow).map(Vec::as_slice)
    }

    pub fn result(&self, workflow: usize, node: usize) -> Option<&Value> {
        self.workflows
            .get(&workflow)
            .and_then(|slots| slots.get(node))
            .and_then(Option::as_ref)
    }

    /// Follow a field reference into a stored result
    pub fn resolve(&self, field: &FieldRef) -> Option<&Value> {
        let root = self.result(field.workflow, field.node)?;
        field
            .path
            .iter()
            .try_fold(root, |value, segment| match (segment, value) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
                (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
                _ => None,
            })
    }

    /// Number of workflows with an entry
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Option<Value>])> {
        self.workflows.iter().map(|(idx, slots)| (*idx, slots.as_slice()))
    }

    pub fn clear(&mut self) {
        self.workflows.clear();
    }
}

/// Structured pointer into the state table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRef {
    #[serde(default)]
    pub workflow: usize,
    pub node: usize,
    #[serde(default)]
    pub path: Vec<PathSegment>,
}

impl FieldRef {
    pub fn new(workflow: usize, node: usize) -> Self {
        Self {
            workflow,
            node,
            path: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.path.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.path.push(PathSegment::Index(index));
        self
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state[{}][{}]", self.workflow, self.node)?;
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}
