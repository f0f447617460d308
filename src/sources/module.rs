//! Module-backed sources.
//!
//! A module is a named, host-registered callable that produces configuration
//! (or, for the sources hook, a list of descriptors) at resolution time.

use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Boxed error type returned by module invocations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Arguments passed to a module invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleArgs {
    /// Modifiers from the source descriptor
    pub modifiers: Vec<String>,
}

/// A callable that produces a configuration value.
#[async_trait]
pub trait ConfigModule: Send + Sync {
    /// Invoke the module.
    async fn invoke(&self, args: ModuleArgs) -> std::result::Result<Value, BoxError>;
}

/// Resolves module references to callables.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load the module named by `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Module`] if the reference cannot be resolved.
    async fn load(&self, reference: &str) -> Result<Arc<dyn ConfigModule>>;
}

/// Adapter turning a synchronous closure into a [`ConfigModule`].
pub struct FnModule<F>(F);

impl<F> FnModule<F>
where
    F: Fn(&ModuleArgs) -> std::result::Result<Value, BoxError> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ConfigModule for FnModule<F>
where
    F: Fn(&ModuleArgs) -> std::result::Result<Value, BoxError> + Send + Sync,
{
    async fn invoke(&self, args: ModuleArgs) -> std::result::Result<Value, BoxError> {
        (self.0)(&args)
    }
}

/// Registry of named modules.
///
/// # Examples
///
/// ```rust
/// use configr::sources::{ModuleRegistry, SourceDescriptor};
/// use serde_json::json;
///
/// let modules = ModuleRegistry::new()
///     .with_fn("get-config", |_args| Ok(json!({"configKeyOne": "configValOne"})));
/// let source = SourceDescriptor::module("get-config");
/// ```
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn ConfigModule>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `reference`, replacing any previous one.
    pub fn register(&mut self, reference: impl Into<String>, module: impl ConfigModule + 'static) {
        self.modules.insert(reference.into(), Arc::new(module));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_module(
        mut self,
        reference: impl Into<String>,
        module: impl ConfigModule + 'static,
    ) -> Self {
        self.register(reference, module);
        self
    }

    /// Register a synchronous closure.
    pub fn with_fn<F>(self, reference: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ModuleArgs) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.with_module(reference, FnModule::new(f))
    }

    /// Registered references, sorted.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        refs.sort_unstable();
        refs
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(&self, reference: &str) -> Result<Arc<dyn ConfigModule>> {
        self.modules
            .get(reference)
            .cloned()
            .ok_or_else(|| ConfigError::module(reference, "no module registered under this reference"))
    }
}

/// Load `reference` and invoke it.
pub(crate) async fn invoke(
    loader: &dyn ModuleLoader,
    reference: &str,
    args: ModuleArgs,
) -> Result<Value> {
    let module = loader.load(reference).await?;
    module
        .invoke(args)
        .await
        .map_err(|e| ConfigError::module(reference, e))
}
