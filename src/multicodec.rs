//! # Key Multicodec
//!
//! Wraps raw public key bytes with a two-byte type prefix and multibase
//! (base58btc) encodes the result. This is the `publicKeyMultibase` form used
//! by `did:key` identifiers and `Multikey` verification methods.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::multibase::{self, Base};

/// Multicodec prefix for Ed25519 public keys.
pub const ED25519_CODEC: [u8; 2] = [0xed, 0x01];

/// Multicodec prefix for compressed secp256k1 public keys.
pub const SECP256K1_CODEC: [u8; 2] = [0xe7, 0x01];

/// Multicodec prefix for compressed ECDSA P-256 public keys.
pub const P256_CODEC: [u8; 2] = [0x12, 0x00];

/// Key types supported by this crate.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Ed25519 (EdDSA) keys.
    #[default]
    Ed25519,

    /// ECDSA keys on the secp256k1 curve.
    Secp256k1,

    /// ECDSA keys on the NIST P-256 curve.
    EcdsaP256,
}

impl KeyType {
    /// Every supported key type.
    pub const ALL: [Self; 3] = [Self::Ed25519, Self::Secp256k1, Self::EcdsaP256];

    /// Multicodec prefix.
    #[must_use]
    pub const fn codec(self) -> [u8; 2] {
        match self {
            Self::Ed25519 => ED25519_CODEC,
            Self::Secp256k1 => SECP256K1_CODEC,
            Self::EcdsaP256 => P256_CODEC,
        }
    }

    /// Length of the raw public key. ECDSA keys are stored compressed.
    #[must_use]
    pub const fn key_length(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::Secp256k1 | Self::EcdsaP256 => 33,
        }
    }

    /// Verification method type used in DID documents for this key type.
    #[must_use]
    pub const fn method_type(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519VerificationKey2020",
            Self::Secp256k1 => "EcdsaSecp256k1VerificationKey2019",
            Self::EcdsaP256 => "EcdsaSecp256r1VerificationKey2019",
        }
    }

    /// Find the key type for a multicodec prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKeyTypePrefix`] for an unrecognised prefix.
    pub fn from_codec(prefix: [u8; 2]) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kt| kt.codec() == prefix)
            .ok_or_else(|| Error::UnknownKeyTypePrefix(u16::from_be_bytes(prefix)))
    }

    /// Check the raw key length for this key type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] when the length does not match.
    pub fn check_length(self, raw: &[u8]) -> crate::Result<()> {
        if raw.len() != self.key_length() {
            return Err(Error::InvalidKeyLength {
                key_type: self.to_string(),
                expected: self.key_length(),
                actual: raw.len(),
            });
        }
        Ok(())
    }
}

impl Display for KeyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::Secp256k1 => write!(f, "Secp256k1"),
            Self::EcdsaP256 => write!(f, "EcdsaP256"),
        }
    }
}

impl FromStr for KeyType {
    type Err = Error;

    /// Parse a key type from its short name or from a verification method
    /// type.
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kt| kt.to_string() == s || kt.method_type() == s)
            .ok_or_else(|| Error::UnsupportedKeyType(s.to_string()))
    }
}

/// Raw public key bytes tagged with their key type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey {
    /// The key type.
    pub key_type: KeyType,

    /// Raw public key bytes (compressed for ECDSA key types).
    pub bytes: Vec<u8>,
}

impl PublicKey {
    /// Create a public key, checking the byte length against the key type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] when the length does not match.
    pub fn new(key_type: KeyType, bytes: impl Into<Vec<u8>>) -> crate::Result<Self> {
        let bytes = bytes.into();
        key_type.check_length(&bytes)?;
        Ok(Self { key_type, bytes })
    }

    /// Encode as a prefixed multibase string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] when the key has been constructed
    /// with the wrong length.
    pub fn to_multibase(&self) -> crate::Result<String> {
        encode_with_type(&self.bytes, self.key_type)
    }

    /// Decode from a prefixed multibase string.
    ///
    /// # Errors
    ///
    /// See [`decode_with_type`].
    pub fn from_multibase(encoded: &str) -> crate::Result<Self> {
        let (key_type, bytes) = decode_with_type(encoded)?;
        Ok(Self { key_type, bytes })
    }

    /// The `did:key` identifier for the key.
    ///
    /// # Errors
    ///
    /// See [`PublicKey::to_multibase`].
    pub fn to_did_key(&self) -> crate::Result<String> {
        crate::key::generate_did_key(&self.bytes, self.key_type)
    }
}

/// Prefix raw public key bytes with the multicodec for `key_type` and encode
/// the result as base58btc multibase.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyLength`] if the key length is wrong for the key
/// type.
pub fn encode_with_type(public_key: &[u8], key_type: KeyType) -> crate::Result<String> {
    key_type.check_length(public_key)?;

    let mut multi_bytes = key_type.codec().to_vec();
    multi_bytes.extend_from_slice(public_key);
    Ok(multibase::encode(&multi_bytes, Base::Base58Btc))
}

/// Decode a prefixed multibase key into its key type and raw bytes.
///
/// # Errors
///
/// Fails when the string is not valid multibase, is too short to carry a
/// prefix, carries an unknown prefix, or the remaining key bytes have the
/// wrong length for the key type.
pub fn decode_with_type(encoded: &str) -> crate::Result<(KeyType, Vec<u8>)> {
    let bytes = multibase::decode(encoded)?;
    if bytes.len() < 2 {
        return Err(Error::InvalidFormat(format!(
            "multicodec key requires at least 2 bytes, got {}",
            bytes.len()
        )));
    }

    let key_type = KeyType::from_codec([bytes[0], bytes[1]])?;
    let raw = bytes[2..].to_vec();
    key_type.check_length(&raw)?;

    Ok((key_type, raw))
}
