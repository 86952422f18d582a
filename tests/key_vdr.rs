//! Tests for creating, resolving and updating `did:key` documents through the
//! `KeyVdr`.

use vercre_identity::document::{KeyId, VerificationMethodBuilder};
use vercre_identity::vdr::{CreateRequest, DocumentStore, KeyVdr, MutationResult, UpdateOptions, Vdr};
use vercre_identity::{Document, Error, KeyType, PublicKey, Relationship, Service};

fn new_key() -> PublicKey {
    use vercre_identity::crypto::{CryptoProvider, Provider};
    let pair =
        Provider::for_key_type(KeyType::Ed25519).generate_key_pair().expect("should generate");
    PublicKey::new(KeyType::Ed25519, pair.public_key).expect("should wrap")
}

// A key created with only `authentication` cannot change the document. Once a
// delegating key exists, its changes are visible on resolve.
#[tokio::test]
async fn authorized_mutations() {
    let vdr = KeyVdr::default();
    let key = new_key();
    let did = key.to_did_key().expect("should derive");
    let primary = format!("{did}#{}", key.to_multibase().expect("should encode"));

    let request = CreateRequest {
        public_key_multibase: key.to_multibase().expect("should encode"),
        preferred_did: Some(did.clone()),
        relationships: vec![Relationship::Authentication],
        ..CreateRequest::default()
    };
    vdr.create(request).await.expect("should create");

    let second = VerificationMethodBuilder::new(new_key())
        .did(&did)
        .key_id(KeyId::Fragment("key-2".into()))
        .build()
        .expect("should build");

    let err = vdr
        .add_verification_method(
            &did,
            second.clone(),
            vec![Relationship::Authentication],
            &UpdateOptions::new(&primary),
        )
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::Unauthorized(_)));

    // grant the primary key delegation and retry
    vdr.store().reset().expect("should reset");
    let request = CreateRequest {
        public_key_multibase: key.to_multibase().expect("should encode"),
        relationships: vec![Relationship::Authentication, Relationship::CapabilityDelegation],
        ..CreateRequest::default()
    };
    vdr.create(request).await.expect("should create");

    vdr.add_verification_method(
        &did,
        second,
        vec![Relationship::Authentication],
        &UpdateOptions::new(&primary),
    )
    .await
    .expect("should add");

    let resolved = vdr.resolve(&did).await.expect("should resolve").expect("should exist");
    assert_eq!(resolved.verification_method.len(), 2);
    assert!(resolved.has_relationship(&format!("{did}#key-2"), Relationship::Authentication));

    let doc = vdr
        .update_relationships(
            &did,
            "#key-2",
            vec![Relationship::AssertionMethod],
            vec![Relationship::Authentication],
            &UpdateOptions::new(&primary),
        )
        .await
        .expect("should update");
    let key_2 = format!("{did}#key-2");
    assert!(doc.has_relationship(&key_2, Relationship::AssertionMethod));
    assert!(!doc.has_relationship(&key_2, Relationship::Authentication));
}

// Service changes need `capabilityInvocation`, which a default `did:key`
// document grants to its key.
#[tokio::test]
async fn service_changes() {
    let vdr = KeyVdr::new(DocumentStore::new());
    let key = new_key();
    let did = key.to_did_key().expect("should derive");
    let options = UpdateOptions::new(format!("#{}", key.to_multibase().expect("should encode")));

    let service = Service::new("#hub", "DIDCommMessaging", "https://hub.example.com");
    let doc = vdr.add_service(&did, service, &options).await.expect("should add");
    assert!(doc.service(&format!("{did}#hub")).is_some());

    let doc = vdr.remove_service(&did, "#hub", &options).await.expect("should remove");
    assert!(doc.service.is_empty());

    let err = vdr.remove_service(&did, "#hub", &options).await.expect_err("should fail");
    let result = MutationResult::from(Err::<Document, _>(err));
    assert!(!result.success);
    assert_eq!(result.error.expect("should have error")["error"], "not_found");
}

// The key a `did:key` was derived from cannot be removed.
#[tokio::test]
async fn primary_key_protected() {
    let vdr = KeyVdr::default();
    let key = new_key();
    let did = key.to_did_key().expect("should derive");
    let primary = format!("{did}#{}", key.to_multibase().expect("should encode"));

    let err = vdr
        .remove_verification_method(&did, &primary, &UpdateOptions::new(&primary))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::CannotRemovePrimaryKey(_)));

    let resolved = vdr.resolve(&did).await.expect("should resolve").expect("should exist");
    assert_eq!(resolved.verification_method.len(), 1);
}

// Updating an unknown DID reports it as missing.
#[tokio::test]
async fn unknown_did() {
    let vdr = KeyVdr::default();
    let err = vdr
        .remove_service("did:web:example.com", "#hub", &UpdateOptions::new("#key-0"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::NotFound(_)));
}
