//! Method name to handler mapping.
//!
//! The embedding application populates the [`HandlerRegistry`] before the
//! session starts. The dispatcher only ever looks handlers up by name, so
//! the set of supported methods can grow without touching the core.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{HandlerError, RegistryError};
use crate::jsonrpc::RequestId;

/// Signature shared by all registered handlers.
///
/// Handlers receive the request id (`None` for notifications) and the raw
/// parameters, and return the JSON result.
pub type HandlerFn = dyn Fn(Option<&RequestId>, Value) -> Result<Value, HandlerError>;

/// Registry of method handlers.
///
/// # Example
///
/// ```
/// use lantern_rpc::HandlerRegistry;
/// use serde_json::json;
///
/// let mut registry = HandlerRegistry::new();
/// registry
///     .register("ping", |_id, _params| Ok(json!("pong")))
///     .expect("registration succeeds");
/// assert!(registry.contains("ping"));
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<HandlerFn>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `method`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateMethod`] if the method already has
    /// a handler.
    pub fn register<F>(&mut self, method: impl Into<String>, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(Option<&RequestId>, Value) -> Result<Value, HandlerError> + 'static,
    {
        let name = method.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::DuplicateMethod { method: name });
        }
        self.handlers.insert(name, Box::new(handler));
        Ok(())
    }

    /// Registers a handler with typed parameters and result.
    ///
    /// Parameters that fail to decode into `P` yield
    /// [`HandlerError::InvalidParams`]; absent parameters are decoded from
    /// JSON `null`, so `Option<T>` accepts them.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateMethod`] if the method already has
    /// a handler.
    pub fn register_typed<P, R, F>(
        &mut self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(Option<&RequestId>, P) -> Result<R, HandlerError> + 'static,
    {
        self.register(method, move |id, params| {
            let typed: P = serde_json::from_value(params)
                .map_err(|error| HandlerError::invalid_params(error.to_string()))?;
            let result = handler(id, typed)?;
            serde_json::to_value(result)
                .map_err(|error| HandlerError::failed(format!("failed to encode result: {error}")))
        })
    }

    /// Looks up the handler for `method`.
    #[must_use]
    pub fn get(&self, method: &str) -> Option<&HandlerFn> {
        self.handlers.get(method).map(Box::as_ref)
    }

    /// Returns `true` when `method` has a handler.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Returns the registered method names in sorted order.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandlerRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}
