use async_trait::async_trait;
use nodalcore::{Entity, FieldRef, Method, MethodError, Node, Parameters, StateTable, Value};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// `Logic` entity: conditional evaluation
pub fn logic_entity() -> Entity {
    Entity::new("Logic").with_method("if", IfMethod)
}

/// Compare two operands and report which branch applies
///
/// The chosen branch comes back as data in the result; nothing in it is executed.
pub struct IfMethod;

#[derive(Debug, Deserialize)]
struct IfParams {
    left_operand: Operand,
    right_operand: Operand,
    operator: Operator,
    #[serde(default)]
    then: Vec<Node>,
    #[serde(default, rename = "else")]
    otherwise: Vec<Node>,
}

/// Either a literal value or `{"ref": {...}}` pointing into the state table
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Ref(FieldRef),
    Literal(Value),
}

impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(mut map) if map.contains_key("ref") => {
                if map.len() != 1 {
                    return Err(D::Error::custom("a ref operand takes no keys besides \"ref\""));
                }
                let target = map.remove("ref").unwrap_or_default();
                serde_json::from_value(serde_json::Value::from(target))
                    .map(Operand::Ref)
                    .map_err(|e| D::Error::custom(format!("invalid ref: {}", e)))
            }
            literal => Ok(Operand::Literal(literal)),
        }
    }
}

impl Operand {
    fn resolve(&self, state: &StateTable) -> Result<Value, MethodError> {
        match self {
            Operand::Ref(field) => state
                .resolve(field)
                .cloned()
                .ok_or_else(|| MethodError::ReferenceNotFound(field.to_string())),
            Operand::Literal(value) => Ok(value.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    Contains,
}

impl Operator {
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        match self {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::GreaterThan => match (left, right) {
                (Value::Number(l), Value::Number(r)) => l > r,
                (Value::String(l), Value::String(r)) => l > r,
                _ => false,
            },
            Operator::LessThan => match (left, right) {
                (Value::Number(l), Value::Number(r)) => l < r,
                (Value::String(l), Value::String(r)) => l < r,
                _ => false,
            },
            Operator::Contains => match (left, right) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
        }
    }
}

#[async_trait]
impl Method for IfMethod {
    async fn call(&self, parameters: &Parameters, state: &StateTable) -> Result<Value, MethodError> {
        let params: IfParams = parameters.parse()?;
        let left = params.left_operand.resolve(state)?;
        let right = params.right_operand.resolve(state)?;

        let result = params.operator.evaluate(&left, &right);
        tracing::debug!("Logic.if {:?} {:?} {:?} -> {}", left, params.operator, right, result);

        let (executed, branch) = if result {
            ("then", params.then)
        } else {
            ("else", params.otherwise)
        };

        Ok(Value::object([
            ("result", Value::Bool(result)),
            ("executed", Value::from(executed)),
            ("branch", nodes_to_value(&branch)?),
        ]))
    }
}

/// Render a node list back into plain data
pub(crate) fn nodes_to_value(nodes: &[Node]) -> Result<Value, MethodError> {
    serde_json::to_value(nodes)
        .map(Value::from)
        .map_err(|e| MethodError::ExecutionFailed(format!("Failed to encode nodes: {}", e)))
}
