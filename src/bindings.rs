use crate::value::Value;
use std::collections::HashMap;

/// Name → value environment a template is rendered against.
///
/// `variables` are what tags read by bare name and what FOR loops write.
/// The three parameter scopes are only reachable through the `@paramGet`,
/// `@pparam*` and `@tparam*` functions; `parameters` is read-only from a
/// template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    variables: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
    persistent: HashMap<String, Value>,
    temporary: HashMap<String, Value>,
}

/// One of the writable parameter maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Persistent,
    Temporary,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_variable(name, value.into());
        self
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Binds `name`, returning the value it shadowed.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Option<Value> {
        self.variables.insert(name.to_string(), value)
    }

    /// Puts back what [`Bindings::set_variable`] returned.
    pub fn restore_variable(&mut self, name: &str, previous: Option<Value>) {
        match previous {
            Some(value) => {
                self.variables.insert(name.to_string(), value);
            }
            None => {
                self.variables.remove(name);
            }
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    fn scope(&self, scope: Scope) -> &HashMap<String, Value> {
        match scope {
            Scope::Persistent => &self.persistent,
            Scope::Temporary => &self.temporary,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut HashMap<String, Value> {
        match scope {
            Scope::Persistent => &mut self.persistent,
            Scope::Temporary => &mut self.temporary,
        }
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<&Value> {
        self.scope(scope).get(name)
    }

    pub fn set(&mut self, scope: Scope, name: &str, value: Value) {
        self.scope_mut(scope).insert(name.to_string(), value);
    }

    pub fn remove(&mut self, scope: Scope, name: &str) -> Option<Value> {
        self.scope_mut(scope).remove(name)
    }
}
