//! Tests for deriving `did:key` identifiers and documents from generated keys.

use vercre_identity::crypto::{CryptoProvider, Provider};
use vercre_identity::multibase::{self, Base};
use vercre_identity::{Error, KeyType, PublicKey, Relationship, key, multicodec};

// Every supported key type should derive a `did:key` that expands to a valid
// document listing the key under every relationship.
#[test]
fn generated_keys() {
    for (key_type, prefix) in [
        (KeyType::Ed25519, "did:key:z6Mk"),
        (KeyType::Secp256k1, "did:key:zQ3s"),
        (KeyType::EcdsaP256, "did:key:z2oAt"),
    ] {
        let pair = Provider::for_key_type(key_type).generate_key_pair().expect("should generate");
        let did = key::generate_did_key(&pair.public_key, key_type).expect("should derive");
        assert!(did.starts_with(prefix), "{key_type}: {did}");

        let (parsed_type, parsed_key) = key::parse_did_key(&did).expect("should parse");
        assert_eq!(parsed_type, key_type);
        assert_eq!(parsed_key, pair.public_key);

        let doc = key::document(&did).expect("should expand");
        assert!(doc.validate().is_valid, "{key_type}");

        let vm = doc.primary_key().expect("should have primary key");
        assert_eq!(vm.type_, key_type.method_type());
        assert_eq!(vm.public_key().expect("should decode").bytes, pair.public_key);
        for relationship in Relationship::ALL {
            assert!(doc.has_relationship(&vm.id, relationship), "{relationship}");
        }
    }
}

// The multibase and multicodec layers compose into the `did:key` suffix.
#[test]
fn layered_encoding() {
    let pair = Provider::for_key_type(KeyType::Ed25519).generate_key_pair().expect("should generate");

    let mut prefixed = KeyType::Ed25519.codec().to_vec();
    prefixed.extend_from_slice(&pair.public_key);
    let encoded = multibase::encode(&prefixed, Base::Base58Btc);

    assert_eq!(
        multicodec::encode_with_type(&pair.public_key, KeyType::Ed25519).expect("should encode"),
        encoded
    );
    let key = PublicKey::from_multibase(&encoded).expect("should decode");
    assert_eq!(key.to_did_key().expect("should derive"), format!("did:key:{encoded}"));
}

// Malformed identifiers fail with the error naming the problem.
#[test]
fn malformed_identifiers() {
    let err = key::parse_did_key("did:web:example.com").expect_err("should fail");
    assert!(matches!(err, Error::InvalidFormat(_)));

    let err = key::parse_did_key("did:key:z1111").expect_err("should fail");
    assert!(matches!(err, Error::UnknownKeyTypePrefix(_)));

    // base64url, not base58
    let encoded = multibase::encode([0xed, 0x01, 0x00], Base::Base64Url);
    let err = key::parse_did_key(&format!("did:key:{encoded}")).expect_err("should fail");
    assert!(matches!(err, Error::InvalidFormat(_) | Error::InvalidKeyLength { .. }));

    let short = multibase::encode([0xed, 0x01, 0x00, 0x01], Base::Base58Btc);
    let err = key::parse_did_key(&format!("did:key:{short}")).expect_err("should fail");
    assert!(matches!(err, Error::InvalidKeyLength { expected: 32, actual: 2, .. }));
}
