use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::new_nonce;

/// A challenge for the client to sign with its platform authenticator, and
/// the nonce the client must present with the resulting assertion.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Base64url-encoded random challenge.
    pub challenge: String,

    /// Nonce bound to the challenge.
    pub nonce: String,
}

#[derive(Debug)]
struct Issued {
    nonce: String,
    issued_at: i64,
}

/// Outstanding challenges. Each may be consumed once, within its time to live.
#[derive(Debug)]
pub struct ChallengeStore {
    ttl_secs: i64,
    issued: Mutex<HashMap<String, Issued>>,
}

impl ChallengeStore {
    /// Create a store whose challenges live for `ttl_secs`.
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a new challenge, pruning expired ones.
    pub fn issue(&self, now: i64) -> Challenge {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let challenge = Challenge {
            challenge: Base64UrlUnpadded::encode_string(&bytes),
            nonce: new_nonce(),
        };

        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        let before = issued.len();
        issued.retain(|_, i| self.is_live(i, now));
        if issued.len() < before {
            debug!(pruned = before - issued.len(), "pruned expired challenges");
        }
        issued.insert(
            challenge.challenge.clone(),
            Issued {
                nonce: challenge.nonce.clone(),
                issued_at: now,
            },
        );

        challenge
    }

    /// The nonce issued with a live challenge.
    #[must_use]
    pub fn lookup(&self, challenge: &str, now: i64) -> Option<String> {
        let issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        issued
            .get(challenge)
            .filter(|i| self.is_live(i, now))
            .map(|i| i.nonce.clone())
    }

    /// Remove a live challenge. Returns `false` if it was never issued, has
    /// expired, or was already consumed.
    pub fn consume(&self, challenge: &str, now: i64) -> bool {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        issued.remove(challenge).is_some_and(|i| self.is_live(&i, now))
    }

    fn is_live(&self, issued: &Issued, now: i64) -> bool {
        now.checked_sub(issued.issued_at).is_some_and(|age| age <= self.ttl_secs)
    }

    /// Number of challenges held, including any expired but not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issued.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no challenges are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_use() {
        let store = ChallengeStore::new(300);
        let issued = store.issue(1000);
        assert_eq!(Base64UrlUnpadded::decode_vec(&issued.challenge).expect("decode").len(), 32);

        assert_eq!(store.lookup(&issued.challenge, 1100), Some(issued.nonce.clone()));
        assert!(store.consume(&issued.challenge, 1100));
        assert!(!store.consume(&issued.challenge, 1100));
        assert_eq!(store.lookup(&issued.challenge, 1100), None);
    }

    #[test]
    fn expiry_and_pruning() {
        let store = ChallengeStore::new(300);
        let old = store.issue(1000);
        assert_eq!(store.lookup(&old.challenge, 1301), None);
        assert!(!store.consume(&old.challenge, 1301));

        let stale = store.issue(1000);
        store.issue(1400);
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&stale.challenge, 1000), None);
    }

    #[test]
    fn extreme_clock() {
        let store = ChallengeStore::new(300);
        let issued = store.issue(-1000);
        assert_eq!(store.lookup(&issued.challenge, i64::MAX), None);
        assert!(!store.consume(&issued.challenge, i64::MAX));

        let issued = store.issue(i64::MAX);
        assert_eq!(store.lookup(&issued.challenge, i64::MIN), None);
        assert_eq!(store.issue(i64::MIN).nonce.len(), 22);
    }
}
