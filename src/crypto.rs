//! # Crypto Providers
//!
//! One provider per supported key type, each implementing the same
//! [`CryptoProvider`] contract. Callers select a provider by [`KeyType`] (or by
//! verification method type) through [`Provider`]; key material is never
//! inspected to pick a provider.

mod ecdsa_p256;
mod ed25519;
mod secp256k1;

use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;

pub use self::ecdsa_p256::{EcdsaP256, compress_public_key, decompress_public_key};
pub use self::ed25519::Ed25519;
pub use self::secp256k1::Secp256k1;
use crate::document::MULTIKEY;
use crate::error::Error;
use crate::multicodec::KeyType;

/// Key generation, signing and verification for a single key type.
pub trait CryptoProvider {
    /// The key type handled by the provider.
    fn key_type(&self) -> KeyType;

    /// Generate a new key pair.
    ///
    /// # Errors
    ///
    /// Fails if the generated key cannot be exported.
    fn generate_key_pair(&self) -> crate::Result<KeyPair>;

    /// Sign `data` with the private key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the private key cannot be used by the
    /// provider.
    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> crate::Result<Vec<u8>>;

    /// Verify a signature over `data`. Malformed keys or signatures verify as
    /// `false`.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool;

    /// Derive the public key (in the form used by `did:key`) from a private
    /// key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the private key cannot be used by the
    /// provider.
    fn derive_public_key(&self, private_key: &PrivateKey) -> crate::Result<Vec<u8>>;
}

/// A public key and the private key it was generated with.
#[derive(Clone, Debug)]
pub struct KeyPair {
    /// Raw public key bytes, compressed for ECDSA key types.
    pub public_key: Vec<u8>,

    /// The private key.
    pub private_key: PrivateKey,
}

/// Private key material.
#[derive(Clone)]
pub enum PrivateKey {
    /// Exported raw key bytes.
    Raw(Vec<u8>),

    /// An opaque key that never leaves its holder.
    Handle(KeyHandle),
}

impl PrivateKey {
    /// Raw key bytes, for providers that cannot work with opaque handles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a key handle.
    pub fn raw(&self, key_type: KeyType) -> crate::Result<&[u8]> {
        match self {
            Self::Raw(bytes) => Ok(bytes),
            Self::Handle(_) => Err(Error::InvalidKey(format!(
                "{key_type} requires raw private key bytes, got a key handle"
            ))),
        }
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(_) => f.write_str("PrivateKey::Raw(..)"),
            Self::Handle(handle) => write!(f, "PrivateKey::Handle({handle:?})"),
        }
    }
}

impl From<Vec<u8>> for PrivateKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Raw(bytes)
    }
}

/// A non-exportable P-256 signing key.
#[derive(Clone)]
pub struct KeyHandle(pub(crate) p256::ecdsa::SigningKey);

impl Debug for KeyHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("KeyHandle(..)")
    }
}

/// Provider dispatch by key type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// Ed25519 provider.
    Ed25519(Ed25519),

    /// Secp256k1 provider.
    Secp256k1(Secp256k1),

    /// ECDSA P-256 provider.
    EcdsaP256(EcdsaP256),
}

impl Provider {
    /// The provider for a key type.
    #[must_use]
    pub const fn for_key_type(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => Self::Ed25519(Ed25519),
            KeyType::Secp256k1 => Self::Secp256k1(Secp256k1),
            KeyType::EcdsaP256 => Self::EcdsaP256(EcdsaP256),
        }
    }

    /// The provider for a verification method type, such as
    /// `Ed25519VerificationKey2020`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedKeyType`] for an unknown method type,
    /// including `Multikey`, whose key type is carried by the key itself.
    pub fn for_method_type(method_type: &str) -> crate::Result<Self> {
        if method_type == MULTIKEY {
            return Err(Error::UnsupportedKeyType(
                "Multikey methods select a provider from the key prefix".into(),
            ));
        }
        Ok(Self::for_key_type(KeyType::from_str(method_type)?))
    }

    /// Returns `true` if a provider exists for the key type or method type.
    #[must_use]
    pub fn supports(key_type: &str) -> bool {
        KeyType::from_str(key_type).is_ok()
    }

    fn inner(&self) -> &dyn CryptoProvider {
        match self {
            Self::Ed25519(p) => p,
            Self::Secp256k1(p) => p,
            Self::EcdsaP256(p) => p,
        }
    }
}

impl CryptoProvider for Provider {
    fn key_type(&self) -> KeyType {
        self.inner().key_type()
    }

    fn generate_key_pair(&self) -> crate::Result<KeyPair> {
        self.inner().generate_key_pair()
    }

    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        self.inner().sign(data, private_key)
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        self.inner().verify(data, signature, public_key)
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        self.inner().derive_public_key(private_key)
    }
}
