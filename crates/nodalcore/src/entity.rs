use crate::{MethodError, Parameters, StateTable, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Core trait that every entity method implements
#[async_trait]
pub trait Method: Send + Sync {
    /// Run the method against its parameters and a read-only view of all prior results
    async fn call(&self, parameters: &Parameters, state: &StateTable) -> Result<Value, MethodError>;
}

/// Adapter turning a synchronous closure into a [`Method`]
pub struct FnMethod<F>(F);

#[async_trait]
impl<F> Method for FnMethod<F>
where
    F: Fn(&Parameters, &StateTable) -> Result<Value, MethodError> + Send + Sync,
{
    async fn call(&self, parameters: &Parameters, state: &StateTable) -> Result<Value, MethodError> {
        (self.0)(parameters, state)
    }
}

/// Named collection of methods, e.g. "Telegram" with `get_messages` and `send_message`
#[derive(Clone)]
pub struct Entity {
    name: String,
    methods: HashMap<String, Arc<dyn Method>>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn with_method(mut self, name: impl Into<String>, method: impl Method + 'static) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Register a synchronous closure as a method
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Parameters, &StateTable) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.with_method(name, FnMethod(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<Arc<dyn Method>> {
        self.methods.get(name).cloned()
    }

    /// Method names, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .finish()
    }
}
