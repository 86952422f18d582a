use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::{CryptoProvider, KeyPair, PrivateKey};
use crate::error::Error;
use crate::multicodec::KeyType;

/// Secp256k1 ECDSA provider.
///
/// Signs the SHA-256 digest of the input, producing 64-byte compact (`r ∥ s`)
/// signatures. Public keys are 33-byte compressed points. Key handles are not
/// supported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Secp256k1;

impl Secp256k1 {
    fn signing_key(private_key: &PrivateKey) -> crate::Result<SigningKey> {
        let raw = private_key.raw(KeyType::Secp256k1)?;
        SigningKey::from_slice(raw).map_err(|e| Error::InvalidKey(format!("secp256k1: {e}")))
    }

    fn compressed(signing_key: &SigningKey) -> Vec<u8> {
        signing_key.verifying_key().to_encoded_point(true).as_bytes().to_vec()
    }
}

impl CryptoProvider for Secp256k1 {
    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn generate_key_pair(&self) -> crate::Result<KeyPair> {
        let signing_key = SigningKey::random(&mut OsRng);
        Ok(KeyPair {
            public_key: Self::compressed(&signing_key),
            private_key: PrivateKey::Raw(signing_key.to_bytes().to_vec()),
        })
    }

    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        let digest = Sha256::digest(data);
        let signature: Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| Error::Other(anyhow::anyhow!("secp256k1 signing failed: {e}")))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let digest = Sha256::digest(data);
        verifying_key.verify_prehash(&digest, &signature).is_ok()
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        Ok(Self::compressed(&Self::signing_key(private_key)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::EcdsaP256;

    #[test]
    fn compact_signature() {
        let pair = Secp256k1.generate_key_pair().expect("should generate");
        assert!(matches!(pair.public_key[0], 0x02 | 0x03));

        let sig = Secp256k1.sign(b"payload", &pair.private_key).expect("should sign");
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn rejects_key_handle() {
        let handle = EcdsaP256::generate_handle().expect("should generate").private_key;
        let err = Secp256k1.sign(b"payload", &handle).expect_err("should fail");
        assert!(matches!(err, Error::InvalidKey(_)));
        assert!(matches!(Secp256k1.derive_public_key(&handle), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn zero_private_key() {
        let err = Secp256k1.sign(b"x", &PrivateKey::Raw(vec![0; 32])).expect_err("should fail");
        assert!(matches!(err, Error::InvalidKey(_)));
    }
}
