//! # configr
//!
//! Layered configuration aggregated from files, HTTPS endpoints, modules and
//! the environment.
//!
//! ## Overview
//!
//! `configr` builds one merged configuration object out of an ordered list of
//! sources:
//! - Local files and `https://` URLs, each with optional *modifier* overlays
//!   (`app.yaml` + `["dev"]` also reads `app.dev.yaml`)
//! - Named modules registered by the host application
//! - A baseline directory of `default`/`<env>`/`local` files
//! - A JSON object in `CONFIGR_CONFIG_JSON`
//! - `configr_`-prefixed environment overrides
//!
//! Later sources win, mappings merge recursively, and everything else is
//! replaced. The merged result is published through `arc-swap`, so reads
//! never block.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use configr::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct AppConfig {
//!     server: ServerConfig,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerConfig {
//!     port: u16,
//! }
//!
//! # async fn example() -> configr::error::Result<()> {
//! let aggregator = Aggregator::builder()
//!     .with_source(SourceDescriptor::new("config/app.yaml").with_modifiers(["dev"]))
//!     .build()
//!     .await?;
//!
//! let config: AppConfig = aggregator.try_deserialize()?;
//! println!("Server port: {}", config.server.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `remote` (default): HTTPS sources through `reqwest`
//! - `file-watch` (default): refresh file sources when their files change

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{Aggregator, AggregatorBuilder, Baseline, ConfigCache};
    pub use crate::error::{ConfigError, ErrorKind, Result};
    pub use crate::sources::{Env, ModuleRegistry, Source, SourceDescriptor, SourceKind};
}
