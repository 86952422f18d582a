use std::future::Future;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::{Map, Value};

use super::{DidSignature, SignedData, SignedObject};
use crate::crypto::{CryptoProvider, KeyPair, PrivateKey, Provider};
use crate::multicodec::{KeyType, PublicKey};

/// Holds a DID's signing key.
///
/// Async and fallible so implementers can keep keys in a remote key store.
pub trait Signer: Send + Sync {
    /// DID of the signer.
    fn did(&self) -> &str;

    /// The verification method used to sign.
    fn key_id(&self) -> &str;

    /// Key type of the signing key.
    fn key_type(&self) -> KeyType;

    /// Sign the message.
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = crate::Result<Vec<u8>>> + Send;
}

/// A `did:key` signer holding its key in memory.
#[derive(Clone, Debug)]
pub struct LocalSigner {
    did: String,
    key_id: String,
    key_type: KeyType,
    public_key: Vec<u8>,
    private_key: PrivateKey,
}

impl LocalSigner {
    /// Generate a new key and derive its `did:key`.
    ///
    /// # Errors
    ///
    /// Fails if the key cannot be generated.
    pub fn generate(key_type: KeyType) -> crate::Result<Self> {
        let pair = Provider::for_key_type(key_type).generate_key_pair()?;
        Self::from_key_pair(key_type, pair)
    }

    /// Use an existing key pair. The key ID is the `did:key` verification
    /// method, `did#<multibase>`.
    ///
    /// # Errors
    ///
    /// Fails if the public key is not valid for the key type.
    pub fn from_key_pair(key_type: KeyType, pair: KeyPair) -> crate::Result<Self> {
        let key = PublicKey::new(key_type, pair.public_key)?;
        let multibase = key.to_multibase()?;
        let did = key.to_did_key()?;

        Ok(Self {
            key_id: format!("{did}#{multibase}"),
            did,
            key_type,
            public_key: key.bytes,
            private_key: pair.private_key,
        })
    }

    /// Sign with a different verification method of the same DID.
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Raw public key bytes.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The public key as prefixed multibase.
    ///
    /// # Errors
    ///
    /// Fails if the key cannot be encoded.
    pub fn public_key_multibase(&self) -> crate::Result<String> {
        crate::multicodec::encode_with_type(&self.public_key, self.key_type)
    }
}

impl Signer for LocalSigner {
    fn did(&self) -> &str {
        &self.did
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn key_type(&self) -> KeyType {
        self.key_type
    }

    async fn try_sign(&self, msg: &[u8]) -> crate::Result<Vec<u8>> {
        Provider::for_key_type(self.key_type).sign(msg, &self.private_key)
    }
}

/// A fresh random nonce: 16 bytes, base64url encoded.
#[must_use]
pub fn new_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Sign `signed_data` as is, using its nonce and timestamp.
///
/// # Errors
///
/// Fails if the data cannot be serialized or the signer fails.
pub async fn sign(signed_data: SignedData, signer: &impl Signer) -> crate::Result<SignedObject> {
    let msg = signed_data.canonical_bytes()?;
    let sig = signer.try_sign(&msg).await?;

    Ok(SignedObject {
        signed_data,
        signature: DidSignature {
            signer_did: signer.did().to_string(),
            key_id: signer.key_id().to_string(),
            value: Base64UrlUnpadded::encode_string(&sig),
        },
    })
}

/// Sign request fields, adding a fresh nonce and the current timestamp.
///
/// # Errors
///
/// Fails if the data cannot be serialized or the signer fails.
pub async fn sign_payload(
    fields: Map<String, Value>, signer: &impl Signer,
) -> crate::Result<SignedObject> {
    let signed_data = SignedData {
        fields,
        nonce: new_nonce(),
        timestamp: Utc::now().timestamp(),
    };
    sign(signed_data, signer).await
}
