use crate::logic::nodes_to_value;
use async_trait::async_trait;
use nodalcore::{Entity, FieldRef, Method, MethodError, Node, Parameters, StateTable, Value};
use serde::Deserialize;

/// `Loop` entity: iteration over an array held in the state table
pub fn loop_entity() -> Entity {
    Entity::new("Loop").with_method("foreach", ForeachMethod)
}

/// Bind each item of the referenced array to the `of` name
///
/// Returns one `{<of>: item, executed: true}` record per item. The `do`
/// nodes are echoed back as data and not executed.
pub struct ForeachMethod;

#[derive(Debug, Deserialize)]
struct ForeachParams {
    iterator: FieldRef,
    of: String,
    #[serde(default, rename = "do")]
    body: Vec<Node>,
}

#[async_trait]
impl Method for ForeachMethod {
    async fn call(&self, parameters: &Parameters, state: &StateTable) -> Result<Value, MethodError> {
        let params: ForeachParams = parameters.parse()?;

        let target = state
            .resolve(&params.iterator)
            .ok_or_else(|| MethodError::ReferenceNotFound(params.iterator.to_string()))?;
        let items = target.as_array().ok_or_else(|| MethodError::InvalidParameterType {
            field: "iterator".to_string(),
            expected: "array".to_string(),
            actual: target.kind().to_string(),
        })?;

        tracing::debug!("Loop.foreach over {} items of {}", items.len(), params.iterator);

        let results = items
            .iter()
            .map(|item| {
                Value::object([
                    (params.of.clone(), item.clone()),
                    ("executed".to_string(), Value::Bool(true)),
                ])
            })
            .collect::<Vec<_>>();

        Ok(Value::object([
            ("count", Value::from(items.len())),
            ("results", Value::Array(results)),
            ("do", nodes_to_value(&params.body)?),
        ]))
    }
}
