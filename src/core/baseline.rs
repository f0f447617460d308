//! The baseline default configuration.
//!
//! Loaded once per aggregator, from a directory of conventionally named
//! files: `default`, `<env>`, `local`, `local-<env>`, each optional and in
//! any format the `config` crate recognizes, later files overriding earlier
//! ones.

use crate::error::{ConfigError, Result};
use crate::sources::Env;
use config::File;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

/// Environment variable selecting the run environment for baseline files.
pub const DEFAULT_RUN_ENV_VAR: &str = "CONFIGR_ENV";

/// Where the baseline configuration comes from.
#[derive(Debug, Clone)]
pub enum Baseline {
    /// No baseline.
    Empty,
    /// A fixed value.
    Value(Value),
    /// Conventionally named files in a directory.
    Files {
        /// Directory holding `default.*`, `<env>.*`, `local.*`, `local-<env>.*`
        dir: PathBuf,
        /// Run environment; read from the run-env variable when unset
        env: Option<String>,
    },
}

impl Baseline {
    /// Files in `dir`, run environment taken from the environment.
    pub fn files(dir: impl Into<PathBuf>) -> Self {
        Self::Files {
            dir: dir.into(),
            env: None,
        }
    }

    /// Snapshot the baseline.
    ///
    /// File reads are synchronous; from async code use [`Baseline::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] if a present file cannot be parsed.
    pub fn load(&self, env: &Env, run_env_var: &str) -> Result<Value> {
        match self {
            Self::Empty => Ok(Value::Object(Map::new())),
            Self::Value(value) => Ok(value.clone()),
            Self::Files { dir, env: run_env } => {
                let run_env = run_env
                    .clone()
                    .or_else(|| env.var(run_env_var).map(str::to_string))
                    .filter(|e| !e.is_empty());
                load_dir(dir, run_env.as_deref())
            }
        }
    }

    /// [`load`](Self::load) on the blocking thread pool when files are involved.
    ///
    /// # Errors
    ///
    /// Returns the load error, or [`ConfigError::Other`] if the blocking task
    /// is lost.
    pub async fn snapshot(&self, env: &Env, run_env_var: &str) -> Result<Value> {
        if !matches!(self, Self::Files { .. }) {
            return self.load(env, run_env_var);
        }

        let (baseline, env, run_env_var) = (self.clone(), env.clone(), run_env_var.to_string());
        tokio::task::spawn_blocking(move || baseline.load(&env, &run_env_var))
            .await
            .map_err(|e| ConfigError::Other(format!("baseline load task failed: {}", e)))?
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::files("config")
    }
}

fn load_dir(dir: &std::path::Path, run_env: Option<&str>) -> Result<Value> {
    let mut names = vec!["default".to_string()];
    if let Some(run_env) = run_env {
        names.push(run_env.to_string());
    }
    names.push("local".to_string());
    if let Some(run_env) = run_env {
        names.push(format!("local-{}", run_env));
    }

    let mut builder = config::Config::builder();
    for name in &names {
        let path = dir.join(name);
        builder = builder.add_source(File::with_name(&path.to_string_lossy()).required(false));
    }

    let decode_error = |e: config::ConfigError| ConfigError::Decode {
        location: dir.display().to_string(),
        message: e.to_string(),
    };

    let value = builder
        .build()
        .map_err(decode_error)?
        .try_deserialize::<Value>()
        .map_err(decode_error)?;

    debug!(dir = %dir.display(), ?run_env, "baseline loaded");
    match value {
        Value::Object(_) => Ok(value),
        _ => Ok(Value::Object(Map::new())),
    }
}
