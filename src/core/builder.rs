//! Builder for constructing Aggregator instances.

use crate::core::{Aggregator, Baseline};
use crate::error::Result;
use crate::sources::{
    DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR, DefaultTransport, Env, ModuleLoader,
    ModuleRegistry, SourceDescriptor, Transport,
};
use std::sync::Arc;

/// Names of the environment variables the aggregator consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvNames {
    /// JSON array of source descriptors, listed ahead of explicit sources
    pub sources_json: String,
    /// Module reference returning a list of source descriptors
    pub sources_import: String,
    /// JSON object merged above the baseline
    pub config_json: String,
    /// Run environment used to pick baseline files
    pub run_env: String,
}

impl EnvNames {
    /// Names derived from `prefix`, e.g. `MYAPP` gives `MYAPP_SOURCES_JSON`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            sources_json: format!("{}_SOURCES_JSON", prefix),
            sources_import: format!("{}_SOURCES_IMPORT", prefix),
            config_json: format!("{}_CONFIG_JSON", prefix),
            run_env: format!("{}_ENV", prefix),
        }
    }
}

impl Default for EnvNames {
    fn default() -> Self {
        Self::with_prefix("CONFIGR")
    }
}

/// Builder for constructing an [`Aggregator`].
///
/// # Examples
///
/// ```rust,no_run
/// use configr::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let aggregator = Aggregator::builder()
///     .with_source(SourceDescriptor::new("config/app.yaml").with_modifiers(["dev"]))
///     .with_source("https://config.example.com/app.json")
///     .with_env_overrides("APP_", "__")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AggregatorBuilder {
    pub(crate) sources: Vec<SourceDescriptor>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) modules: Arc<dyn ModuleLoader>,
    pub(crate) env: Option<Env>,
    pub(crate) baseline: Baseline,
    pub(crate) env_prefix: String,
    pub(crate) env_separator: String,
    pub(crate) env_names: EnvNames,
}

impl AggregatorBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults: no explicit sources, the default transport, no modules, the
    /// process environment, baseline files from `config/`, and
    /// `configr_`-prefixed env overrides split on `_`.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            transport: Arc::new(DefaultTransport::new()),
            modules: Arc::new(ModuleRegistry::new()),
            env: None,
            baseline: Baseline::default(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            env_separator: DEFAULT_ENV_SEPARATOR.to_string(),
            env_names: EnvNames::default(),
        }
    }

    /// Add a source. Later sources override earlier ones.
    pub fn with_source(mut self, descriptor: impl Into<SourceDescriptor>) -> Self {
        self.sources.push(descriptor.into());
        self
    }

    /// Add several sources, in order.
    pub fn with_sources<I, D>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<SourceDescriptor>,
    {
        self.sources.extend(descriptors.into_iter().map(Into::into));
        self
    }

    /// Replace the file/HTTP transport.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Replace the module loader.
    pub fn with_modules(mut self, modules: impl ModuleLoader + 'static) -> Self {
        self.modules = Arc::new(modules);
        self
    }

    /// Use a fixed environment instead of the process environment.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    /// Set the baseline configuration.
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    /// Configure environment-variable overrides.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Case-sensitive variable prefix (e.g., "configr_")
    /// * `separator` - Separator for nested keys (e.g., "__" for APP_DB__HOST)
    ///
    /// Overrides sit above every other layer.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use configr::prelude::*;
    ///
    /// # async fn example() {
    /// // APP_SERVER__PORT=8080 -> server.port = "8080"
    /// Aggregator::builder()
    ///     .with_env_overrides("APP_", "__");
    /// # }
    /// ```
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self.env_separator = separator.to_string();
        self
    }

    /// Derive the sources/JSON/run-env variable names from `prefix`.
    pub fn with_env_names(mut self, prefix: &str) -> Self {
        self.env_names = EnvNames::with_prefix(prefix);
        self
    }

    /// Build the aggregator.
    ///
    /// Resolves every source concurrently and merges the result.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The baseline or the environment source list cannot be read
    /// - Two initial sources share an identity
    /// - Any source fails to resolve
    pub async fn build(self) -> Result<Aggregator> {
        Aggregator::from_builder(self).await
    }
}

impl Default for AggregatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
