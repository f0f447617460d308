//! Subscriber-based notifications for configuration changes.

use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
pub struct SubscriptionHandle {
    id: usize,
    registry: Arc<Mutex<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let mut inner = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        inner.subscribers.retain(|(sub_id, _)| *sub_id != self.id);
    }
}

#[derive(Default)]
struct SubscriberRegistryInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Registry of callbacks invoked with the new merged configuration.
///
/// # Examples
///
/// ```rust
/// use configr::notify::SubscriberRegistry;
/// use serde_json::json;
///
/// let registry = SubscriberRegistry::new();
/// let handle = registry.subscribe(|config| println!("config changed: {config}"));
///
/// registry.notify_all(&json!({"port": 8080}));
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// ```
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays registered until the handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Invoke every callback, in subscription order.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or
    /// drop handles themselves.
    pub fn notify_all(&self, config: &Value) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback(config);
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_and_notify() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _handle = registry.subscribe(move |config| {
            seen_clone.lock().unwrap().push(config.clone());
        });

        registry.notify_all(&json!({"a": 1}));
        registry.notify_all(&json!({"a": 2}));
        assert_eq!(*seen.lock().unwrap(), vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let handle = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_all(&json!({}));
        drop(handle);
        registry.notify_all(&json!({}));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_count_and_clone() {
        let registry = SubscriberRegistry::new();
        let registry2 = registry.clone();

        let _handle1 = registry.subscribe(|_| {});
        let handle2 = registry2.subscribe(|_| {});
        assert_eq!(registry.subscriber_count(), 2);

        drop(handle2);
        assert_eq!(registry2.subscriber_count(), 1);
    }

    #[test]
    fn test_callback_may_subscribe() {
        let registry = SubscriberRegistry::new();
        let inner_registry = registry.clone();
        let handles = Arc::new(Mutex::new(Vec::new()));

        let handles_clone = Arc::clone(&handles);
        let _handle = registry.subscribe(move |_| {
            let h = inner_registry.subscribe(|_| {});
            handles_clone.lock().unwrap().push(h);
        });

        registry.notify_all(&json!({}));
        assert_eq!(registry.subscriber_count(), 2);
    }
}
