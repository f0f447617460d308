//! Resolved configuration sources.

use super::descriptor::{SourceDescriptor, SourceKind};
use super::env::{DEFAULT_ENV_SEPARATOR, Env};
use super::module::{self, ModuleArgs, ModuleLoader, ModuleRegistry};
use super::transport::{DefaultTransport, Transport};
use crate::core::decode::decode_document;
use crate::core::fetch::{FetchOptions, fetch};
use crate::core::location::expand;
use crate::core::merge::{deep_merge, is_empty};
use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Collaborators a source resolves through.
#[derive(Clone)]
pub struct SourceContext {
    /// File and HTTP access
    pub transport: Arc<dyn Transport>,
    /// Module references
    pub modules: Arc<dyn ModuleLoader>,
    /// Environment snapshot
    pub env: Env,
    /// Baseline default configuration
    pub baseline: Arc<Value>,
    /// Path separator for env-prefix overrides
    pub env_separator: String,
}

impl SourceContext {
    /// Context reading the process environment, with no modules and an
    /// empty baseline.
    pub fn new() -> Self {
        Self {
            transport: Arc::new(DefaultTransport::new()),
            modules: Arc::new(ModuleRegistry::new()),
            env: Env::from_process(),
            baseline: Arc::new(Value::Object(Map::new())),
            env_separator: DEFAULT_ENV_SEPARATOR.to_string(),
        }
    }

    /// Replace the transport.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Replace the module loader.
    pub fn with_modules(mut self, modules: impl ModuleLoader + 'static) -> Self {
        self.modules = Arc::new(modules);
        self
    }

    /// Replace the environment snapshot.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A descriptor together with the configuration it resolved to.
///
/// # Examples
///
/// ```rust,no_run
/// use configr::sources::{Source, SourceContext, SourceDescriptor};
///
/// # async fn example() -> configr::error::Result<()> {
/// let ctx = SourceContext::new();
/// let source = Source::create(
///     SourceDescriptor::new("config/app.yaml").with_modifiers(["dev"]),
///     &ctx,
/// )
/// .await?;
/// println!("{}", source.config());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    descriptor: SourceDescriptor,
    config: Value,
}

impl Source {
    /// Resolve a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Source`] naming the source and wrapping the
    /// underlying failure (invalid descriptor, required location missing,
    /// transport, decode or module failure).
    pub async fn create(descriptor: SourceDescriptor, ctx: &SourceContext) -> Result<Self> {
        let config = resolve(&descriptor, ctx)
            .await
            .map_err(|e| e.in_source(descriptor.identity()))?;
        Ok(Self { descriptor, config })
    }

    /// Resolve again from the original descriptor, picking up external changes.
    pub async fn refresh(&self, ctx: &SourceContext) -> Result<Self> {
        Self::create(self.descriptor.clone(), ctx).await
    }

    /// The original descriptor.
    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// The resolved configuration mapping.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// The descriptor's location.
    pub fn location(&self) -> &str {
        &self.descriptor.location
    }

    /// Identity key: `name` if given, else `location`.
    pub fn identity(&self) -> &str {
        self.descriptor.identity()
    }

    /// Resolution strategy.
    pub fn kind(&self) -> SourceKind {
        self.descriptor.kind()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.descriptor, f)
    }
}

async fn resolve(descriptor: &SourceDescriptor, ctx: &SourceContext) -> Result<Value> {
    descriptor.validate()?;

    match descriptor.kind() {
        SourceKind::File | SourceKind::Http => resolve_chain(descriptor, ctx).await,
        SourceKind::Module => resolve_module(descriptor, ctx).await,
        SourceKind::EnvPrefix => Ok(ctx
            .env
            .prefix_overrides(&descriptor.location, &ctx.env_separator)),
        SourceKind::JsonLiteral => resolve_json_literal(&descriptor.location, &ctx.env),
        SourceKind::Baseline => Ok(ctx.baseline.as_ref().clone()),
    }
}

/// Fold the modifier chain: fetch, decode and merge each location in order.
async fn resolve_chain(descriptor: &SourceDescriptor, ctx: &SourceContext) -> Result<Value> {
    let locations = expand(&descriptor.location, &descriptor.modifiers);
    let mut config = Value::Object(Map::new());

    for location in &locations {
        // without an explicit flag, a location is required only while nothing has been found
        let must_exist = descriptor.must_exist.unwrap_or_else(|| is_empty(&config));
        let options = FetchOptions {
            headers: Some(&descriptor.headers),
            must_exist,
        };

        match fetch(ctx.transport.as_ref(), location, options).await? {
            Some(text) => {
                let overlay = decode_document(&text, location)?;
                debug!(location = %location, "get-modified-config: merged");
                deep_merge(&mut config, overlay);
            }
            None => debug!(location = %location, "no data obtained"),
        }
    }

    Ok(config)
}

async fn resolve_module(descriptor: &SourceDescriptor, ctx: &SourceContext) -> Result<Value> {
    let args = ModuleArgs {
        modifiers: descriptor.modifiers.clone(),
    };
    let value = module::invoke(ctx.modules.as_ref(), &descriptor.location, args).await?;

    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        other => Err(ConfigError::module(
            &descriptor.location,
            format!("expected a configuration mapping, got {}", other),
        )),
    }
}

fn resolve_json_literal(name: &str, env: &Env) -> Result<Value> {
    let text = env.get(name, Some("{}"))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| ConfigError::env(name, format!("invalid JSON: {}", e)))?;

    match value {
        Value::Object(ref map) => {
            if !map.is_empty() {
                debug!(name, "json-create: obtained config");
            }
            Ok(value)
        }
        _ => Err(ConfigError::env(name, "expected a JSON object")),
    }
}
