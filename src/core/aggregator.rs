//! The aggregator: an ordered list of sources and their merged configuration.

use crate::core::builder::{AggregatorBuilder, EnvNames};
use crate::core::merge::{deep_merge_all, lookup};
use crate::error::{ConfigError, Result};
use crate::notify::{SubscriberRegistry, SubscriptionHandle};
use crate::sources::{
    Env, ModuleArgs, Source, SourceContext, SourceDescriptor, SourceKind, invoke_module,
};
use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

#[cfg(feature = "file-watch")]
use crate::notify::WatchHandle;

/// Published state: the source list and the configuration merged from it.
struct Snapshot {
    sources: Vec<Source>,
    config: Arc<Value>,
}

/// Holds an ordered list of sources and publishes their merged configuration.
///
/// Reads go through `arc-swap` and never block. Mutations (`add_source`,
/// `refresh_source`) are serialized and recompute the merge from scratch;
/// a failing mutation leaves the published configuration untouched.
///
/// Merge order, later wins: sources in list order, then the baseline, then
/// the JSON override variable, then env-prefix overrides.
///
/// # Examples
///
/// ```rust,no_run
/// use configr::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let aggregator = Aggregator::create(["config/app.yaml"]).await?;
///
/// // Lock-free read
/// let config = aggregator.config();
/// println!("port: {}", config["server"]["port"]);
///
/// aggregator.add_source("config/extra.yaml").await?;
/// # Ok(())
/// # }
/// ```
pub struct Aggregator {
    ctx: Arc<SourceContext>,
    /// Baseline, JSON override and env-prefix layers, fixed at construction
    layers: Vec<Source>,
    state: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
    subscribers: SubscriberRegistry,
}

impl Aggregator {
    /// Start building an aggregator.
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    /// Build an aggregator from `descriptors` with default settings.
    ///
    /// # Errors
    ///
    /// See [`AggregatorBuilder::build`].
    pub async fn create<I, D>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
        D: Into<SourceDescriptor>,
    {
        Self::builder().with_sources(descriptors).build().await
    }

    pub(crate) async fn from_builder(builder: AggregatorBuilder) -> Result<Self> {
        let env = builder.env.unwrap_or_else(Env::from_process);
        let baseline = builder
            .baseline
            .snapshot(&env, &builder.env_names.run_env)
            .await?;
        let ctx = Arc::new(SourceContext {
            transport: builder.transport,
            modules: builder.modules,
            env,
            baseline: Arc::new(baseline),
            env_separator: builder.env_separator,
        });

        let mut descriptors = discover(&ctx, &builder.env_names).await?;
        descriptors.extend(builder.sources);

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.identity()) {
                return Err(ConfigError::Conflict {
                    identity: descriptor.identity().to_string(),
                });
            }
        }

        let sources = resolve_all(&ctx, descriptors).await?;

        let mut layers = Vec::with_capacity(3);
        for descriptor in [
            SourceDescriptor::of_kind(SourceKind::Baseline, "config"),
            SourceDescriptor::of_kind(SourceKind::JsonLiteral, &builder.env_names.config_json),
            SourceDescriptor::of_kind(SourceKind::EnvPrefix, &builder.env_prefix),
        ] {
            layers.push(Source::create(descriptor, &ctx).await?);
        }

        let config = merge(&sources, &layers);
        info!(sources = sources.len(), "configr: configuration aggregated");

        Ok(Self {
            ctx,
            layers,
            state: ArcSwap::from_pointee(Snapshot { sources, config }),
            write_lock: Mutex::new(()),
            subscribers: SubscriberRegistry::new(),
        })
    }

    /// The merged configuration.
    ///
    /// Lock-free; the returned value is a snapshot unaffected by later
    /// mutations.
    pub fn config(&self) -> Arc<Value> {
        Arc::clone(&self.state.load().config)
    }

    /// Value at a dotted path in the merged configuration, e.g. `"a.b.c"`.
    pub fn get(&self, path: &str) -> Option<Value> {
        lookup(&self.state.load().config, path).cloned()
    }

    /// Deserialize the merged configuration into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationError`] if the configuration
    /// does not match `T`.
    pub fn try_deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(self.config().as_ref())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// The source with identity key `identity`.
    pub fn source(&self, identity: &str) -> Option<Source> {
        self.state
            .load()
            .sources
            .iter()
            .find(|s| s.identity() == identity)
            .cloned()
    }

    /// All sources, in precedence order (lowest first).
    pub fn sources(&self) -> Vec<Source> {
        self.state.load().sources.clone()
    }

    /// The environment snapshot this aggregator was built with.
    pub fn env(&self) -> &Env {
        &self.ctx.env
    }

    /// Resolve and append a source; it overrides every earlier source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Conflict`] if a source with the same identity
    /// exists, or the resolution error. Nothing is published on failure.
    pub async fn add_source(&self, descriptor: impl Into<SourceDescriptor>) -> Result<()> {
        let descriptor = descriptor.into();
        let _guard = self.write_lock.lock().await;

        let current = self.state.load_full();
        if current
            .sources
            .iter()
            .any(|s| s.identity() == descriptor.identity())
        {
            return Err(ConfigError::Conflict {
                identity: descriptor.identity().to_string(),
            });
        }

        let source = Source::create(descriptor, &self.ctx).await?;
        info!(source = %source.identity(), "source added");

        let mut sources = current.sources.clone();
        sources.push(source);
        self.publish(sources);
        Ok(())
    }

    /// Re-resolve a source from its original descriptor, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if no source has this
    /// identity, or the resolution error. Nothing is published on failure.
    pub async fn refresh_source(&self, identity: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let current = self.state.load_full();
        let index = current
            .sources
            .iter()
            .position(|s| s.identity() == identity)
            .ok_or_else(|| ConfigError::SourceNotFound {
                identity: identity.to_string(),
            })?;

        let refreshed = current.sources[index].refresh(&self.ctx).await?;
        info!(source = %identity, "source refreshed");

        let mut sources = current.sources.clone();
        sources[index] = refreshed;
        self.publish(sources);
        Ok(())
    }

    /// Subscribe to configuration changes.
    ///
    /// The callback receives the new merged configuration after every
    /// successful `add_source` or `refresh_source`. Drop the handle to
    /// unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Refresh file-backed sources when their files change.
    ///
    /// Watching stops when the returned handle or the aggregator is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file watcher cannot be created.
    #[cfg(feature = "file-watch")]
    pub fn watch(self: &Arc<Self>, debounce: std::time::Duration) -> Result<WatchHandle> {
        crate::notify::watcher::watch(self, debounce)
    }

    /// Must be called with the write lock held.
    fn publish(&self, sources: Vec<Source>) {
        let config = merge(&sources, &self.layers);
        self.state.store(Arc::new(Snapshot {
            sources,
            config: Arc::clone(&config),
        }));
        self.subscribers.notify_all(&config);
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        let descriptors: Vec<&SourceDescriptor> =
            state.sources.iter().map(Source::descriptor).collect();
        let text = serde_json::to_string_pretty(&descriptors).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        let identities: Vec<&str> = state.sources.iter().map(Source::identity).collect();
        f.debug_struct("Aggregator")
            .field("sources", &identities)
            .field("subscribers", &self.subscribers.subscriber_count())
            .finish_non_exhaustive()
    }
}

fn merge(sources: &[Source], layers: &[Source]) -> Arc<Value> {
    Arc::new(deep_merge_all(
        sources.iter().chain(layers).map(|s| s.config().clone()),
    ))
}

/// Descriptors listed in the environment, then those returned by the import module.
async fn discover(ctx: &SourceContext, names: &EnvNames) -> Result<Vec<SourceDescriptor>> {
    let mut descriptors = Vec::new();

    if let Some(text) = ctx
        .env
        .var(&names.sources_json)
        .filter(|t| !t.trim().is_empty())
    {
        let listed: Vec<SourceDescriptor> = serde_json::from_str(text).map_err(|e| {
            ConfigError::env(&names.sources_json, format!("invalid source list: {}", e))
        })?;
        debug!(count = listed.len(), "sources from environment");
        descriptors.extend(listed);
    }

    if let Some(reference) = ctx
        .env
        .var(&names.sources_import)
        .filter(|r| !r.trim().is_empty())
    {
        let value = invoke_module(ctx.modules.as_ref(), reference, ModuleArgs::default()).await?;
        let imported: Vec<SourceDescriptor> = serde_json::from_value(value).map_err(|e| {
            ConfigError::module(reference, format!("expected a list of source descriptors: {}", e))
        })?;
        debug!(count = imported.len(), module = reference, "sources from import");
        descriptors.extend(imported);
    }

    Ok(descriptors)
}

/// Resolve every descriptor concurrently, keeping list order.
///
/// The first failure aborts the remaining resolutions.
async fn resolve_all(
    ctx: &Arc<SourceContext>,
    descriptors: Vec<SourceDescriptor>,
) -> Result<Vec<Source>> {
    let mut slots: Vec<Option<Source>> = vec![None; descriptors.len()];
    let mut tasks = JoinSet::new();

    for (index, descriptor) in descriptors.into_iter().enumerate() {
        let ctx = Arc::clone(ctx);
        tasks.spawn(async move { (index, Source::create(descriptor, &ctx).await) });
    }

    while let Some(joined) = tasks.join_next().await {
        let (index, result) =
            joined.map_err(|e| ConfigError::Other(format!("source resolution task failed: {}", e)))?;
        slots[index] = Some(result?);
    }

    Ok(slots.into_iter().flatten().collect())
}
