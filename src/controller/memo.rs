//! Compute-if-absent memoization shared across fare markets.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::observability::metrics;

/// A thread-safe memo table.
///
/// The lookup and the insert are separate short critical sections and the
/// computation runs with no lock held. Two threads missing the same key at
/// once both compute; the first insert wins and the other result is dropped.
/// This is harmless because equal keys produce equal values.
#[derive(Debug, Clone)]
pub struct Memo<K, V>
where
    K: Eq + Hash,
{
    inner: Arc<DashMap<K, V>>,
}

impl<K, V> Default for Memo<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Cached value for `key`, computing it first if absent.
    ///
    /// The flag is true when the value came from the table.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> (V, bool) {
        if let Some(value) = self.get(&key) {
            metrics::record_memo(true);
            return (value, true);
        }
        metrics::record_memo(false);
        let value = compute();
        let stored = self.inner.entry(key).or_insert(value).value().clone();
        (stored, false)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_computes_once() {
        let memo: Memo<String, u32> = Memo::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            7
        };

        assert_eq!(memo.get_or_compute("k".to_string(), compute), (7, false));
        assert_eq!(memo.get_or_compute("k".to_string(), || 9), (7, true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_clones_share_table() {
        let memo: Memo<u8, &'static str> = Memo::new();
        let other = memo.clone();
        memo.get_or_compute(1, || "one");
        assert_eq!(other.get(&1), Some("one"));
    }

    #[test]
    fn test_concurrent_race_keeps_one_value() {
        let memo: Memo<u8, u8> = Memo::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                let memo = memo.clone();
                s.spawn(move || memo.get_or_compute(1, || 42));
            }
        });
        assert_eq!(memo.get(&1), Some(42));
        assert_eq!(memo.len(), 1);
    }
}
