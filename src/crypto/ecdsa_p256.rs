use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::{CryptoProvider, KeyHandle, KeyPair, PrivateKey};
use crate::error::Error;
use crate::multicodec::KeyType;

/// ECDSA P-256 provider.
///
/// Public keys are stored as 33-byte compressed points and decompressed for
/// verification. Signing accepts raw key bytes or a [`KeyHandle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EcdsaP256;

impl EcdsaP256 {
    /// Generate a key pair whose private key is held as an opaque handle.
    ///
    /// # Errors
    ///
    /// Fails if the generated public key cannot be compressed.
    pub fn generate_handle() -> crate::Result<KeyPair> {
        let signing_key = SigningKey::random(&mut OsRng);
        Ok(KeyPair {
            public_key: public_key(&signing_key)?,
            private_key: PrivateKey::Handle(KeyHandle(signing_key)),
        })
    }

    fn signing_key(private_key: &PrivateKey) -> crate::Result<SigningKey> {
        match private_key {
            PrivateKey::Raw(raw) => {
                SigningKey::from_slice(raw).map_err(|e| Error::InvalidKey(format!("P-256: {e}")))
            }
            PrivateKey::Handle(handle) => Ok(handle.0.clone()),
        }
    }
}

fn public_key(signing_key: &SigningKey) -> crate::Result<Vec<u8>> {
    let uncompressed = signing_key.verifying_key().to_encoded_point(false);
    compress_public_key(uncompressed.as_bytes())
}

/// Compress a 65-byte uncompressed SEC1 point (`0x04 ∥ x ∥ y`) into its
/// 33-byte form. The format byte is `0x02` for even `y` and `0x03` for odd.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyLength`] unless the input is a 65-byte
/// uncompressed point.
pub fn compress_public_key(uncompressed: &[u8]) -> crate::Result<Vec<u8>> {
    if uncompressed.len() != 65 || uncompressed[0] != 0x04 {
        return Err(Error::InvalidKeyLength {
            key_type: KeyType::EcdsaP256.to_string(),
            expected: 65,
            actual: uncompressed.len(),
        });
    }

    let mut compressed = Vec::with_capacity(33);
    compressed.push(0x02 | (uncompressed[64] & 1));
    compressed.extend_from_slice(&uncompressed[1..33]);
    Ok(compressed)
}

/// Decompress a 33-byte P-256 point into its 65-byte uncompressed form.
///
/// # Errors
///
/// Returns [`Error::InvalidCompressedKey`] if the bytes are not a point on the
/// curve.
pub fn decompress_public_key(compressed: &[u8]) -> crate::Result<Vec<u8>> {
    let key = p256::PublicKey::from_sec1_bytes(compressed)
        .map_err(|e| Error::InvalidCompressedKey(format!("P-256: {e}")))?;
    Ok(key.to_encoded_point(false).as_bytes().to_vec())
}

impl CryptoProvider for EcdsaP256 {
    fn key_type(&self) -> KeyType {
        KeyType::EcdsaP256
    }

    /// Generates a key pair with an exported raw private key. Use
    /// [`EcdsaP256::generate_handle`] to keep the key opaque.
    fn generate_key_pair(&self) -> crate::Result<KeyPair> {
        let signing_key = SigningKey::random(&mut OsRng);
        Ok(KeyPair {
            public_key: public_key(&signing_key)?,
            private_key: PrivateKey::Raw(signing_key.to_bytes().to_vec()),
        })
    }

    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        let digest = Sha256::digest(data);
        let signature: Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| Error::Other(anyhow::anyhow!("P-256 signing failed: {e}")))?;
        Ok(signature.to_bytes().to_vec())
    }

    /// Accepts compressed or uncompressed public keys and either 64-byte
    /// fixed or DER-encoded signatures.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let signature = if signature.len() == 64 {
            Signature::from_slice(signature)
        } else {
            Signature::from_der(signature)
        };
        let Ok(signature) = signature else {
            return false;
        };
        let digest = Sha256::digest(data);
        verifying_key.verify_prehash(&digest, &signature).is_ok()
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        public_key(&Self::signing_key(private_key)?)
    }
}
