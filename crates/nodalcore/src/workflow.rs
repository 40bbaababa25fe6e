use crate::{MethodError, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque parameter document handed to a method
///
/// The engine never looks inside; each method validates its own parameters,
/// either field by field or by deserializing into a typed struct with [`Parameters::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(HashMap<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get required parameter or return error
    pub fn require(&self, name: &str) -> Result<&Value, MethodError> {
        self.0
            .get(name)
            .ok_or_else(|| MethodError::MissingParameter(name.to_string()))
    }

    /// Get required string parameter
    pub fn require_str(&self, name: &str) -> Result<&str, MethodError> {
        let value = self.require(name)?;
        value
            .as_str()
            .ok_or_else(|| MethodError::InvalidParameterType {
                field: name.to_string(),
                expected: "string".to_string(),
                actual: value.kind().to_string(),
            })
    }

    /// Get parameter with default
    pub fn get_or(&self, name: &str, default: Value) -> Value {
        self.0.get(name).cloned().unwrap_or(default)
    }

    /// Deserialize the whole document into a typed parameter struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, MethodError> {
        let json = serde_json::Value::from(Value::Object(self.0.clone()));
        serde_json::from_value(json).map_err(|e| MethodError::InvalidParameters(e.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Value>> for Parameters {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

/// One step of a workflow: an entity method call with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Diagnostic label, e.g. "Check Telegram for messages"
    pub name: String,
    /// Registry key of the entity, e.g. "Telegram"
    pub entity: String,
    /// Method of the entity to call, e.g. "get_messages"
    pub method: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        entity: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            method: method.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters = self.parameters.with(key, value);
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Ordered list of nodes executed as a unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<Node>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            nodes: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Label used in logs: the name, or "workflow" when unnamed
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("workflow")
    }
}

impl From<Vec<Node>> for Workflow {
    fn from(nodes: Vec<Node>) -> Self {
        Self { name: None, nodes }
    }
}
