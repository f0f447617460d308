//! Core configuration management types.

pub mod decode;
pub mod fetch;
pub mod location;
pub mod merge;

mod aggregator;
mod baseline;
mod builder;
mod cache;

pub use aggregator::Aggregator;
pub use baseline::{Baseline, DEFAULT_RUN_ENV_VAR};
pub use builder::{AggregatorBuilder, EnvNames};
pub use cache::ConfigCache;
pub use decode::{Format, decode};
pub use location::{Location, decompose, expand};
pub use merge::{deep_merge, deep_merge_all, lookup};
