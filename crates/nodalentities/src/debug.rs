use async_trait::async_trait;
use nodalcore::{Entity, Method, MethodError, Parameters, StateTable, Value};

/// `Debug` entity: logs its parameters
pub fn debug_entity() -> Entity {
    Entity::new("Debug").with_method("log", LogMethod)
}

/// Simple debug method that logs its parameters
pub struct LogMethod;

#[async_trait]
impl Method for LogMethod {
    async fn call(&self, parameters: &Parameters, _state: &StateTable) -> Result<Value, MethodError> {
        let message = parameters
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("(no message)");

        tracing::info!("DEBUG: {}", message);

        // Also log all parameters for visibility
        for (key, value) in parameters.iter() {
            tracing::debug!("  {}: {:?}", key, value);
        }

        Ok(Value::object([("message", message)]))
    }
}
