use async_trait::async_trait;
use nodalcore::{Entity, Method, MethodError, Parameters, StateTable, Value};
use serde::Deserialize;
use tokio::time::{sleep, Duration};

/// `Time` entity: waiting
pub fn time_entity() -> Entity {
    Entity::new("Time").with_method("delay", DelayMethod)
}

/// Delay execution for a specified duration
pub struct DelayMethod;

#[derive(Debug, Deserialize)]
struct DelayParams {
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    1000
}

#[async_trait]
impl Method for DelayMethod {
    async fn call(&self, parameters: &Parameters, _state: &StateTable) -> Result<Value, MethodError> {
        let params: DelayParams = parameters.parse()?;

        tracing::info!("Delaying for {}ms", params.delay_ms);
        sleep(Duration::from_millis(params.delay_ms)).await;

        Ok(Value::object([("delayed_ms", params.delay_ms as f64)]))
    }
}
