use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{AuthError, AuthInput, NonceCache, SignedObject, Verified};
use crate::crypto::{CryptoProvider, Provider};
use crate::document::{Relationship, absolute_id};
use crate::error::Error;
use crate::vdr::Vdr;

/// Verifier configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOptions {
    /// Maximum difference, in seconds, between the signed timestamp and the
    /// verifier's clock. Also the replay window.
    pub max_clock_skew_secs: i64,

    /// Relationship the signing key must hold.
    pub required_relationship: Relationship,

    /// Accept stale timestamps and replayed nonces, logging a warning for
    /// each. Never enable outside tests.
    pub insecure_test_mode: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_clock_skew_secs: 300,
            required_relationship: Relationship::Authentication,
            insecure_test_mode: false,
        }
    }
}

/// Verifies DIDAuth signed requests.
///
/// Holds no session state. The nonce cache is the only state shared between
/// calls.
#[derive(Debug)]
pub struct Verifier<V: Vdr> {
    vdr: V,
    nonces: NonceCache,
    options: VerifyOptions,
}

impl<V: Vdr> Verifier<V> {
    /// Create a verifier resolving DIDs through `vdr`, with default options.
    #[must_use]
    pub fn new(vdr: V) -> Self {
        Self::with_options(vdr, VerifyOptions::default())
    }

    /// Create a verifier with explicit options.
    #[must_use]
    pub fn with_options(vdr: V, options: VerifyOptions) -> Self {
        if options.insecure_test_mode {
            warn!("DIDAuth verifier running in insecure test mode");
        }
        Self {
            vdr,
            nonces: NonceCache::new(),
            options,
        }
    }

    /// The registry used to resolve signers.
    pub const fn vdr(&self) -> &V {
        &self.vdr
    }

    /// The replay cache.
    pub const fn nonces(&self) -> &NonceCache {
        &self.nonces
    }

    /// Verify a request against the current time.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] describing the first failed check.
    pub async fn verify<'a>(&self, input: impl Into<AuthInput<'a>>) -> Result<Verified, AuthError> {
        self.verify_at(input, Utc::now().timestamp()).await
    }

    /// Verify a request against the supplied Unix time, in seconds.
    ///
    /// Checks run in order: parse, timestamp window, nonce replay, DID
    /// resolution, key lookup, relationship, signature. A nonce reserved by a
    /// request that then fails is released so a forged copy cannot burn it.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] describing the first failed check.
    pub async fn verify_at<'a>(
        &self, input: impl Into<AuthInput<'a>>, now: i64,
    ) -> Result<Verified, AuthError> {
        let object = match input.into() {
            AuthInput::Header(header) => SignedObject::from_header(header),
            AuthInput::Object(object) => Ok(object.clone()),
        };
        let object = object.inspect_err(|e| warn!(code = e.code(), "{e}"))?;

        let result = self.check(&object, now).await;
        if let Err(e) = &result {
            warn!(signer = %object.signature.signer_did, code = e.code(), "{e}");
        }
        result
    }

    #[instrument(level = "debug", skip_all, fields(signer = %object.signature.signer_did))]
    async fn check(&self, object: &SignedObject, now: i64) -> Result<Verified, AuthError> {
        let data = &object.signed_data;
        let sig = &object.signature;
        let window = self.options.max_clock_skew_secs;

        let fresh = now
            .checked_sub(data.timestamp)
            .is_some_and(|skew| skew.unsigned_abs() <= window.unsigned_abs());
        if !fresh {
            let err = AuthError::TimestampOutOfWindow {
                timestamp: data.timestamp,
                now,
            };
            if !self.options.insecure_test_mode {
                return Err(err);
            }
            warn!("insecure test mode: accepting {err}");
        }

        // `did#frag` and `#frag` name the same key
        let key_id = absolute_id(&sig.signer_did, &sig.key_id);
        let reserved =
            self.nonces.reserve(&sig.signer_did, &key_id, &data.nonce, data.timestamp, now, window);
        if !reserved {
            let err = AuthError::NonceReplayed(data.nonce.clone());
            if !self.options.insecure_test_mode {
                return Err(err);
            }
            warn!("insecure test mode: accepting {err}");
        }

        let result = self.check_signature(object).await;
        if reserved && result.is_err() {
            self.nonces.release(&sig.signer_did, &key_id, &data.nonce);
        }
        result
    }

    async fn check_signature(&self, object: &SignedObject) -> Result<Verified, AuthError> {
        let sig = &object.signature;

        let doc = match self.vdr.resolve(&sig.signer_did).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(AuthError::DidNotFound(sig.signer_did.clone())),
            Err(e) => return Err(AuthError::ResolverUnavailable(e.to_string())),
        };

        let Some(vm) = doc.verification_method(&sig.key_id) else {
            return Err(AuthError::KeyNotFound(sig.key_id.clone()));
        };
        let required = self.options.required_relationship;
        if !doc.has_relationship(&vm.id, required) {
            return Err(AuthError::KeyPermissionDenied(format!("{} does not hold {required}", vm.id)));
        }

        let key = vm.public_key().map_err(|e| match e {
            Error::UnsupportedKeyType(t) => AuthError::UnsupportedKeyType(t),
            other => AuthError::ParseError(format!("verification method {}: {other}", vm.id)),
        })?;
        let provider = Provider::for_key_type(key.key_type);
        debug!(key_type = %key.key_type, "verifying signature");

        let signature = Base64UrlUnpadded::decode_vec(&sig.value)
            .map_err(|e| AuthError::ParseError(format!("signature is not base64url: {e}")))?;
        let msg = object
            .signed_data
            .canonical_bytes()
            .map_err(|e| AuthError::ParseError(e.to_string()))?;

        if !provider.verify(&msg, &signature, &key.bytes) {
            return Err(AuthError::SignatureInvalid);
        }

        Ok(Verified {
            signer_did: sig.signer_did.clone(),
            key_id: doc.absolute_id(&vm.id),
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::auth::{LocalSigner, SignedData, Signer, sign};
    use crate::multicodec::KeyType;
    use crate::vdr::KeyVdr;

    const NOW: i64 = 1_700_000_000;

    async fn signed(signer: &LocalSigner, nonce: &str, timestamp: i64) -> SignedObject {
        let serde_json::Value::Object(fields) = json!({"operation": "ping"}) else {
            unreachable!()
        };
        let data = SignedData {
            fields,
            nonce: nonce.into(),
            timestamp,
        };
        sign(data, signer).await.expect("should sign")
    }

    #[tokio::test]
    async fn verifies_every_key_type() {
        let verifier = Verifier::new(KeyVdr::default());
        for key_type in KeyType::ALL {
            let signer = LocalSigner::generate(key_type).expect("should generate");
            let object = signed(&signer, "n1", NOW).await;
            let verified = verifier.verify_at(&object, NOW).await.expect("should verify");
            assert_eq!(verified.signer_did, signer.did());
            assert_eq!(verified.key_id, signer.key_id());
        }
    }

    #[tokio::test]
    async fn tampered_payload() {
        let verifier = Verifier::new(KeyVdr::default());
        let signer = LocalSigner::generate(KeyType::Ed25519).expect("should generate");
        let mut object = signed(&signer, "n1", NOW).await;
        object.signed_data.fields.insert("operation".into(), json!("pong"));

        let err = verifier.verify_at(&object, NOW).await.expect_err("should fail");
        assert_eq!(err, AuthError::SignatureInvalid);

        // the forged copy does not burn the nonce
        let object = signed(&signer, "n1", NOW).await;
        verifier.verify_at(&object, NOW).await.expect("should verify");
    }

    #[tokio::test]
    async fn unknown_key() {
        let verifier = Verifier::new(KeyVdr::default());
        let signer = LocalSigner::generate(KeyType::Ed25519)
            .expect("should generate")
            .with_key_id("#key-2");
        let object = signed(&signer, "n1", NOW).await;

        let err = verifier.verify_at(&object, NOW).await.expect_err("should fail");
        assert!(matches!(err, AuthError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn unresolvable_signer() {
        let verifier = Verifier::new(KeyVdr::default());
        let signer = LocalSigner::generate(KeyType::Ed25519).expect("should generate");
        let mut object = signed(&signer, "n1", NOW).await;
        object.signature.signer_did = "did:web:example.com".into();

        let err = verifier.verify_at(&object, NOW).await.expect_err("should fail");
        assert!(matches!(err, AuthError::DidNotFound(_)));
    }

    #[tokio::test]
    async fn replay_with_relative_key_id() {
        let verifier = Verifier::new(KeyVdr::default());
        let signer = LocalSigner::generate(KeyType::Ed25519).expect("should generate");
        let object = signed(&signer, "n1", NOW).await;
        verifier.verify_at(&object, NOW).await.expect("should verify");

        // key_id is not signed, so either form may arrive
        let fragment = &signer.key_id()[signer.did().len()..];
        let mut replay = object.clone();
        replay.signature.key_id = fragment.to_string();
        let err = verifier.verify_at(&replay, NOW).await.expect_err("should fail");
        assert!(matches!(err, AuthError::NonceReplayed(_)));

        let object = signed(&signer.clone().with_key_id(fragment), "n2", NOW).await;
        let verified = verifier.verify_at(&object, NOW).await.expect("should verify");
        assert_eq!(verified.key_id, signer.key_id());
        let mut replay = object.clone();
        replay.signature.key_id = signer.key_id().to_string();
        let err = verifier.verify_at(&replay, NOW).await.expect_err("should fail");
        assert!(matches!(err, AuthError::NonceReplayed(_)));
    }

    #[tokio::test]
    async fn extreme_timestamps() {
        let verifier = Verifier::new(KeyVdr::default());
        let signer = LocalSigner::generate(KeyType::Ed25519).expect("should generate");

        for timestamp in [NOW.wrapping_add(i64::MIN), i64::MIN, i64::MAX, NOW - 301, NOW + 301] {
            let object = signed(&signer, "n1", timestamp).await;
            let err = verifier.verify_at(&object, NOW).await.expect_err("should fail");
            assert!(matches!(err, AuthError::TimestampOutOfWindow { .. }), "{timestamp}");
        }
        assert!(verifier.nonces().is_empty());

        let object = signed(&signer, "n1", NOW + 300).await;
        verifier.verify_at(&object, NOW).await.expect("should verify");
        let object = signed(&signer, "n2", 0).await;
        let err = verifier.verify_at(&object, i64::MIN).await.expect_err("should fail");
        assert!(matches!(err, AuthError::TimestampOutOfWindow { .. }));
    }

    #[tokio::test]
    async fn insecure_test_mode_tolerates_freshness() {
        let options = VerifyOptions {
            insecure_test_mode: true,
            ..VerifyOptions::default()
        };
        let verifier = Verifier::with_options(KeyVdr::default(), options);
        let signer = LocalSigner::generate(KeyType::Ed25519).expect("should generate");
        let object = signed(&signer, "n1", NOW - 3600).await;

        verifier.verify_at(&object, NOW).await.expect("should tolerate stale timestamp");
        verifier.verify_at(&object, NOW).await.expect("should tolerate replay");
    }
}
