//! Configuration change notification system.
//!
//! Subscribers are told about every published configuration; with the
//! `file-watch` feature, file-backed sources can refresh themselves when
//! their files change.

pub mod subscriber;

#[cfg(feature = "file-watch")]
pub mod watcher;

pub use subscriber::{SubscriberRegistry, SubscriptionHandle};

#[cfg(feature = "file-watch")]
pub use watcher::{FileWatcher, WatchHandle};
