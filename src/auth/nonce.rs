use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// (signer DID, key ID, nonce)
type NonceKey = (String, String, String);

/// Nonces seen within the replay window, keyed by signer, key and nonce.
///
/// Entries are pruned by their signed timestamp: once a timestamp has left the
/// acceptance window any replay of it is rejected on freshness alone.
#[derive(Debug, Default)]
pub struct NonceCache {
    seen: Mutex<HashMap<NonceKey, i64>>,
}

impl NonceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically record the nonce unless it has already been seen. Returns
    /// `false` for a replay.
    ///
    /// Entries with a timestamp older than `now - window` are pruned first.
    pub fn reserve(
        &self, did: &str, key_id: &str, nonce: &str, timestamp: i64, now: i64, window: i64,
    ) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        let cutoff = now.saturating_sub(window);
        let before = seen.len();
        seen.retain(|_, ts| *ts >= cutoff);
        if seen.len() < before {
            debug!(pruned = before - seen.len(), "pruned nonce cache");
        }

        let key = (did.to_string(), key_id.to_string(), nonce.to_string());
        if seen.contains_key(&key) {
            return false;
        }
        seen.insert(key, timestamp);
        true
    }

    /// Forget a reserved nonce.
    pub fn release(&self, did: &str, key_id: &str, nonce: &str) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.remove(&(did.to_string(), key_id.to_string(), nonce.to_string()));
    }

    /// Number of nonces held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no nonces are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn replay_rejected() {
        let cache = NonceCache::new();
        assert!(cache.reserve("did:key:a", "#k", "n1", 1000, 1000, 300));
        assert!(!cache.reserve("did:key:a", "#k", "n1", 1000, 1001, 300));

        // same nonce, different key
        assert!(cache.reserve("did:key:a", "#k2", "n1", 1000, 1001, 300));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn pruned_by_timestamp() {
        let cache = NonceCache::new();
        assert!(cache.reserve("did:key:a", "#k", "n1", 1000, 1000, 300));
        assert!(cache.reserve("did:key:a", "#k", "n2", 1400, 1400, 300));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn extreme_clock() {
        let cache = NonceCache::new();
        assert!(cache.reserve("did:key:a", "#k", "n1", i64::MAX, i64::MIN, 300));
        assert!(cache.reserve("did:key:a", "#k", "n2", i64::MIN, i64::MIN, i64::MAX));
        assert_eq!(cache.len(), 2);

        // n2 falls behind a cutoff of i64::MAX - 300
        assert!(cache.reserve("did:key:a", "#k", "n3", i64::MAX, i64::MAX, 300));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn release_allows_reuse() {
        let cache = NonceCache::new();
        assert!(cache.reserve("did:key:a", "#k", "n1", 1000, 1000, 300));
        cache.release("did:key:a", "#k", "n1");
        assert!(cache.is_empty());
        assert!(cache.reserve("did:key:a", "#k", "n1", 1000, 1000, 300));
    }
}
