use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

use super::{CryptoProvider, KeyPair, PrivateKey};
use crate::error::Error;
use crate::multicodec::KeyType;

/// Ed25519 provider. Keys are raw 32-byte values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ed25519;

impl Ed25519 {
    fn signing_key(private_key: &PrivateKey) -> crate::Result<SigningKey> {
        let raw = private_key.raw(KeyType::Ed25519)?;
        let bytes: &[u8; 32] = raw.try_into().map_err(|_| Error::InvalidKeyLength {
            key_type: KeyType::Ed25519.to_string(),
            expected: 32,
            actual: raw.len(),
        })?;
        Ok(SigningKey::from_bytes(bytes))
    }
}

impl CryptoProvider for Ed25519 {
    fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    fn generate_key_pair(&self) -> crate::Result<KeyPair> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok(KeyPair {
            public_key: signing_key.verifying_key().to_bytes().to_vec(),
            private_key: PrivateKey::Raw(signing_key.to_bytes().to_vec()),
        })
    }

    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        Ok(signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(bytes) = <&[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(data, &signature).is_ok()
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> crate::Result<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)?;
        Ok(signing_key.verifying_key().to_bytes().to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::key;

    // RFC 8032 test 1
    const SECRET: [u8; 32] = [
        0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c,
        0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae,
        0x7f, 0x60,
    ];
    const PUBLIC: [u8; 32] = [
        0xd7, 0x5a, 0x98, 0x01, 0x82, 0xb1, 0x0a, 0xb7, 0xd5, 0x4b, 0xfe, 0xd3, 0xc9, 0x64, 0x07,
        0x3a, 0x0e, 0xe1, 0x72, 0xf3, 0xda, 0xa6, 0x23, 0x25, 0xaf, 0x02, 0x1a, 0x68, 0xf7, 0x07,
        0x51, 0x1a,
    ];

    #[test]
    fn rfc8032_vector() {
        let private_key = PrivateKey::Raw(SECRET.to_vec());
        assert_eq!(Ed25519.derive_public_key(&private_key).expect("should derive"), PUBLIC);

        let sig = Ed25519.sign(b"", &private_key).expect("should sign");
        assert!(Ed25519.verify(b"", &sig, &PUBLIC));
    }

    #[test]
    fn did_key_reads_z6mk() {
        let pair = Ed25519.generate_key_pair().expect("should generate");
        let did = key::generate_did_key(&pair.public_key, KeyType::Ed25519).expect("should encode");
        assert!(did.starts_with("did:key:z6Mk"), "{did}");
    }

    #[test]
    fn short_private_key() {
        let err = Ed25519.sign(b"x", &PrivateKey::Raw(vec![1; 16])).expect_err("should fail");
        assert!(matches!(err, Error::InvalidKeyLength { expected: 32, actual: 16, .. }));
    }
}
