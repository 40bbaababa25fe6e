use nodalcore::{Entity, Method, NodeError};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available entities, keyed by name
#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    entities: HashMap<String, Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut registry = Self::new();
        registry.register(entities);
        registry
    }

    /// Register entities; a repeated name replaces the earlier entity
    pub fn register(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            let name = entity.name().to_string();
            if self.entities.contains_key(&name) {
                tracing::debug!("Replacing entity: {}", name);
            } else {
                tracing::info!("Registering entity: {}", name);
            }
            self.entities.insert(name, entity);
        }
    }

    /// Find the callable for an entity/method pair
    pub fn resolve(&self, entity: &str, method: &str) -> Result<Arc<dyn Method>, NodeError> {
        let found = self
            .entities
            .get(entity)
            .ok_or_else(|| NodeError::EntityNotFound {
                entity: entity.to_string(),
            })?;

        found.method(method).ok_or_else(|| NodeError::MethodNotFound {
            entity: entity.to_string(),
            method: method.to_string(),
        })
    }

    pub fn contains(&self, entity: &str, method: &str) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|e| e.method(method).is_some())
    }

    pub fn get(&self, entity: &str) -> Option<&Entity> {
        self.entities.get(entity)
    }

    /// Registered entity names, sorted
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
