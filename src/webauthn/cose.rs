//! COSE_Key encoding for `did:key` public keys.
//!
//! Only the two fixed layouts platform authenticators produce are handled, so
//! the encoding is written out byte by byte rather than through a general CBOR
//! library:
//!
//! - OKP / Ed25519: `{1: 1, 3: -8, -1: 6, -2: x}`
//! - EC2 / P-256: `{1: 2, 3: -7, -1: 1, -2: x, -3: y}`

use crate::crypto::{compress_public_key, decompress_public_key};
use crate::error::Error;
use crate::multicodec::{KeyType, PublicKey};

// map(4), kty: OKP, alg: EdDSA, crv: Ed25519, x: bstr(32)
const OKP_HEADER: [u8; 10] = [0xa4, 0x01, 0x01, 0x03, 0x27, 0x20, 0x06, 0x21, 0x58, 0x20];

// map(5), kty: EC2, alg: ES256, crv: P-256, x: bstr(32)
const EC2_HEADER: [u8; 10] = [0xa5, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01, 0x21, 0x58, 0x20];

// y: bstr(32)
const EC2_Y: [u8; 3] = [0x22, 0x58, 0x20];

const OKP_LEN: usize = OKP_HEADER.len() + 32;
const EC2_LEN: usize = EC2_HEADER.len() + 32 + EC2_Y.len() + 32;

/// Encode a public key, as held in a `did:key`, as a COSE key. P-256 keys are
/// decompressed to recover `y`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKeyType`] for secp256k1 keys, or an error if
/// the key is malformed.
pub fn encode(key_type: KeyType, public_key: &[u8]) -> crate::Result<Vec<u8>> {
    key_type.check_length(public_key)?;

    match key_type {
        KeyType::Ed25519 => {
            let mut cose = Vec::with_capacity(OKP_LEN);
            cose.extend_from_slice(&OKP_HEADER);
            cose.extend_from_slice(public_key);
            Ok(cose)
        }
        KeyType::EcdsaP256 => {
            let uncompressed = decompress_public_key(public_key)?;
            let mut cose = Vec::with_capacity(EC2_LEN);
            cose.extend_from_slice(&EC2_HEADER);
            cose.extend_from_slice(&uncompressed[1..33]);
            cose.extend_from_slice(&EC2_Y);
            cose.extend_from_slice(&uncompressed[33..65]);
            Ok(cose)
        }
        KeyType::Secp256k1 => {
            Err(Error::UnsupportedKeyType("secp256k1 keys have no WebAuthn COSE form".into()))
        }
    }
}

/// Decode a COSE key in one of the supported layouts. P-256 keys are returned
/// compressed.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] for any other layout.
pub fn decode(cose: &[u8]) -> crate::Result<PublicKey> {
    if cose.len() == OKP_LEN && cose.starts_with(&OKP_HEADER) {
        return PublicKey::new(KeyType::Ed25519, &cose[OKP_HEADER.len()..]);
    }

    if cose.len() == EC2_LEN && cose.starts_with(&EC2_HEADER) {
        let y_at = EC2_HEADER.len() + 32;
        if cose[y_at..y_at + EC2_Y.len()] != EC2_Y {
            return Err(Error::InvalidFormat("COSE EC2 key is missing y".into()));
        }

        let mut uncompressed = Vec::with_capacity(65);
        uncompressed.push(0x04);
        uncompressed.extend_from_slice(&cose[EC2_HEADER.len()..y_at]);
        uncompressed.extend_from_slice(&cose[y_at + EC2_Y.len()..]);
        return PublicKey::new(KeyType::EcdsaP256, compress_public_key(&uncompressed)?);
    }

    Err(Error::InvalidFormat(format!("unsupported COSE key layout ({} bytes)", cose.len())))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{CryptoProvider, EcdsaP256};

    #[test]
    fn okp_layout() {
        let x = [0x11; 32];
        let cose = encode(KeyType::Ed25519, &x).expect("should encode");
        assert_eq!(cose.len(), 42);
        assert_eq!(cose[..10], [0xa4, 0x01, 0x01, 0x03, 0x27, 0x20, 0x06, 0x21, 0x58, 0x20]);
        assert_eq!(cose[10..], x);

        let key = decode(&cose).expect("should decode");
        assert_eq!(key.key_type, KeyType::Ed25519);
        assert_eq!(key.bytes, x);
    }

    #[test]
    fn ec2_layout() {
        let pair = EcdsaP256.generate_key_pair().expect("should generate");
        let uncompressed = decompress_public_key(&pair.public_key).expect("should decompress");

        let cose = encode(KeyType::EcdsaP256, &pair.public_key).expect("should encode");
        assert_eq!(cose.len(), 77);
        assert_eq!(cose[..10], [0xa5, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01, 0x21, 0x58, 0x20]);
        assert_eq!(cose[10..42], uncompressed[1..33]);
        assert_eq!(cose[42..45], [0x22, 0x58, 0x20]);
        assert_eq!(cose[45..], uncompressed[33..]);

        assert_eq!(decode(&cose).expect("should decode").bytes, pair.public_key);
    }

    #[test]
    fn secp256k1_unsupported() {
        let mut key = vec![0x02];
        key.extend_from_slice(&[1; 32]);
        let err = encode(KeyType::Secp256k1, &key).expect_err("should fail");
        assert!(matches!(err, Error::UnsupportedKeyType(_)));
    }

    #[test]
    fn unknown_layout() {
        let mut cose = encode(KeyType::Ed25519, &[0x11; 32]).expect("should encode");
        cose[4] = 0x26;
        assert!(matches!(decode(&cose), Err(Error::InvalidFormat(_))));
    }
}
