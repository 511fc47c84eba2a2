//! Thread-safe load-time sample store.
//!
//! Instrumentation hooks record `(correlation id, load time)` pairs from
//! arbitrary threads; the UI thread reads snapshots to annotate the tree and
//! to decide whether the ribbon shows a slow-load warning.
//!
//! A single mutex guards the map and the subscriber list. It is held only
//! for the mutation or copy; subscribers run after it is released, so a
//! subscriber may call back into the store.

use crate::config::StoreConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A change to the store, delivered to subscribers after the mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// An entry was inserted or overwritten.
    Added {
        /// Correlation id.
        id: String,
        /// Load time in milliseconds.
        value: f64,
    },
    /// All entries were removed.
    Cleared,
}

/// Handle returned by [`SampleStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Inner {
    samples: HashMap<String, f64>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

/// Shared `correlation id -> load time (ms)` map.
///
/// Cloning is cheap and yields another handle to the same store.
#[derive(Clone, Default)]
pub struct SampleStore {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SampleStore")
            .field("samples", &inner.samples.len())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl SampleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the sample for `id`.
    pub fn put(&self, id: impl Into<String>, value: f64) {
        let id = id.into();
        let subscribers = {
            let mut inner = self.inner.lock();
            inner.samples.insert(id.clone(), value);
            Self::clone_subscribers(&inner)
        };
        Self::notify(&subscribers, &ChangeEvent::Added { id, value });
    }

    /// Removes every sample.
    pub fn clear(&self) {
        let subscribers = {
            let mut inner = self.inner.lock();
            inner.samples.clear();
            Self::clone_subscribers(&inner)
        };
        tracing::debug!("sample store cleared");
        Self::notify(&subscribers, &ChangeEvent::Cleared);
    }

    /// Returns an immutable copy of the current samples.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let samples = self.inner.lock().samples.clone();
        StoreSnapshot { samples }
    }

    /// Returns the sample recorded for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<f64> {
        self.inner.lock().samples.get(id).copied()
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    /// Returns true if no samples are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }

    /// Registers a change callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        id
    }

    /// Removes a change callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub, _)| *sub != id);
        inner.subscribers.len() != before
    }

    fn clone_subscribers(inner: &Inner) -> Vec<Subscriber> {
        inner.subscribers.iter().map(|(_, callback)| Arc::clone(callback)).collect()
    }

    fn notify(subscribers: &[Subscriber], event: &ChangeEvent) {
        for callback in subscribers {
            callback(event);
        }
    }
}

/// Point-in-time copy of the store, readable without any lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    samples: HashMap<String, f64>,
}

impl StoreSnapshot {
    /// Load time recorded for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<f64> {
        self.samples.get(id).copied()
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the snapshot holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates over `(id, load time)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.samples.iter().map(|(id, value)| (id.as_str(), *value))
    }

    /// The slowest recorded element.
    #[must_use]
    pub fn slowest(&self) -> Option<(&str, f64)> {
        self.iter().max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Number of samples strictly above `threshold_ms`.
    #[must_use]
    pub fn count_over(&self, threshold_ms: f64) -> usize {
        self.samples.values().filter(|v| **v > threshold_ms).count()
    }

    /// Ribbon warning for loads above the configured threshold, or `None`
    /// when nothing loaded slowly.
    #[must_use]
    pub fn slow_load_warning(&self, config: &StoreConfig) -> Option<SlowLoadWarning> {
        let threshold_ms = config.slow_load_threshold_ms;
        let count = self.count_over(threshold_ms);
        if count == 0 {
            return None;
        }
        let (id, load_time_ms) = self.slowest()?;
        Some(SlowLoadWarning { count, slowest_id: id.to_string(), slowest_ms: load_time_ms })
    }

    /// Consumes the snapshot, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, f64> {
        self.samples
    }
}

/// Aggregate shown on the ribbon when elements load slowly.
#[derive(Debug, Clone, PartialEq)]
pub struct SlowLoadWarning {
    /// Samples above the threshold.
    pub count: usize,
    /// Correlation id of the slowest sample.
    pub slowest_id: String,
    /// Its load time in milliseconds.
    pub slowest_ms: f64,
}
