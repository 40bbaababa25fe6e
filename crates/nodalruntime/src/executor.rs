use crate::registry::EntityRegistry;
use nodalcore::{Node, NodeError, StateTable, Value};
use std::time::Instant;
use tokio::time::{timeout, Duration};

/// Resolves a node against the registry and invokes its method
pub struct NodeDispatcher {
    registry: EntityRegistry,
    node_timeout: Option<Duration>,
}

impl NodeDispatcher {
    pub fn new(registry: EntityRegistry, node_timeout: Option<Duration>) -> Self {
        Self {
            registry,
            node_timeout,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Execute a single node
    ///
    /// Resolution happens here, at execution time, so a node may name an
    /// entity that did not exist when its workflow was queued.
    pub async fn execute(&self, node: &Node, state: &StateTable) -> Result<Value, NodeError> {
        let method = self.registry.resolve(&node.entity, &node.method)?;

        tracing::debug!("Executing node '{}' ({}.{})", node.name, node.entity, node.method);
        let start = Instant::now();

        let call = method.call(&node.parameters, state);
        let result = match self.node_timeout {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(NodeError::Timeout {
                        entity: node.entity.clone(),
                        method: node.method.clone(),
                        millis: limit.as_millis() as u64,
                    })
                }
            },
            None => call.await,
        };

        tracing::debug!(
            "Node '{}' finished in {}ms",
            node.name,
            start.elapsed().as_millis()
        );

        result.map_err(|source| NodeError::Execution {
            entity: node.entity.clone(),
            method: node.method.clone(),
            source,
        })
    }
}
