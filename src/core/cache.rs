//! Process-level memoization of a built aggregator.

use crate::core::merge::lookup;
use crate::core::{Aggregator, AggregatorBuilder};
use crate::error::{ConfigError, Result};
use crate::sources::Env;
use heck::ToShoutySnakeCase;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

type BuildResult = Option<Result<Arc<Aggregator>>>;

enum State {
    Empty,
    Pending(watch::Receiver<BuildResult>),
    Ready(Arc<Aggregator>),
}

struct Inner {
    state: State,
    /// Bumped whenever a build starts or the cache is invalidated
    generation: u64,
}

/// Builds an aggregator once and hands the same instance to every caller.
///
/// Concurrent callers during a build share its outcome; a failed build
/// leaves the cache empty so the next call retries.
///
/// # Examples
///
/// ```rust,no_run
/// use configr::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let cache = ConfigCache::new(Aggregator::builder().with_source("config/app.yaml"));
///
/// let aggregator = cache.get().await?;
/// let port = cache.get_value("server.port", None).await?;
///
/// // Force a rebuild
/// let fresh = cache.get_with(true).await?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigCache {
    builder: AggregatorBuilder,
    inner: Arc<Mutex<Inner>>,
}

impl ConfigCache {
    /// Cache aggregators built by `builder`.
    pub fn new(builder: AggregatorBuilder) -> Self {
        Self {
            builder,
            inner: Arc::new(Mutex::new(Inner {
                state: State::Empty,
                generation: 0,
            })),
        }
    }

    /// The cached aggregator, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns the build error; every caller waiting on that build receives
    /// the same error.
    pub async fn get(&self) -> Result<Arc<Aggregator>> {
        self.get_with(false).await
    }

    /// Like [`get`](Self::get); `bust_cache` discards any cached or
    /// in-flight result and starts a fresh build.
    pub async fn get_with(&self, bust_cache: bool) -> Result<Arc<Aggregator>> {
        let mut rx = {
            let mut inner = lock(&self.inner);
            if bust_cache {
                inner.generation += 1;
                inner.state = State::Empty;
            }
            match &inner.state {
                State::Ready(aggregator) => return Ok(Arc::clone(aggregator)),
                State::Pending(rx) => rx.clone(),
                State::Empty => self.start_build(&mut inner),
            }
        };

        let abandoned = || ConfigError::Other("configuration build was abandoned".to_string());
        let outcome: BuildResult = {
            let ready = rx.wait_for(Option::is_some).await.map_err(|_| abandoned())?;
            (*ready).clone()
        };
        outcome.unwrap_or_else(|| Err(abandoned()))
    }

    /// Drop the cached aggregator; the next `get` rebuilds.
    pub fn invalidate(&self) {
        let mut inner = lock(&self.inner);
        inner.generation += 1;
        inner.state = State::Empty;
    }

    /// Look up a value, environment first.
    ///
    /// The dotted path is converted to an upper snake-case variable name
    /// (`a.b.c` to `A_B_C`, `path.isTrue` to `PATH_IS_TRUE`); if that variable
    /// is set its text is returned. Otherwise the merged configuration at the
    /// path, otherwise `default`.
    ///
    /// The environment is the builder's, or the process environment at call
    /// time. The aggregator is only built when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns the build error if the variable is unset and the aggregator
    /// cannot be built.
    pub async fn get_value(&self, path: &str, default: Option<Value>) -> Result<Option<Value>> {
        let name = env_name(path);
        let env = self.builder.env.clone().unwrap_or_else(Env::from_process);
        if let Some(value) = env.var(&name).filter(|v| !v.is_empty()) {
            debug!(path, env = %name, "config value from environment");
            return Ok(Some(Value::String(value.to_string())));
        }

        let aggregator = self.get().await?;
        Ok(lookup(&aggregator.config(), path).cloned().or(default))
    }

    fn start_build(&self, inner: &mut Inner) -> watch::Receiver<BuildResult> {
        inner.generation += 1;
        let generation = inner.generation;
        let (tx, rx) = watch::channel(None);
        inner.state = State::Pending(rx.clone());

        let builder = self.builder.clone();
        let shared = Arc::clone(&self.inner);
        tokio::spawn(async move {
            debug!(generation, "building configuration");
            let result = builder.build().await.map(Arc::new);
            {
                let mut inner = lock(&shared);
                // a bust or invalidate since this build started owns the state now
                if inner.generation == generation {
                    inner.state = match &result {
                        Ok(aggregator) => State::Ready(Arc::clone(aggregator)),
                        Err(_) => State::Empty,
                    };
                }
            }
            let _ = tx.send(Some(result));
        });

        rx
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn env_name(path: &str) -> String {
    path.replace('.', "_").to_shouty_snake_case()
}
