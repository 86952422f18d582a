//! # DID Key
//!
//! The `did:key` method is a DID method for static cryptographic keys. At its
//! core, it is based on expanding a cryptographic public key into a DID
//! Document.
//!
//! See:
//!
//! - <https://w3c-ccg.github.io/did-method-key>
//! - <https://w3c.github.io/did-resolution>

use crate::document::{
    CreateOptions, Document, DocumentBuilder, Relationship, VerificationMethodBuilder,
};
use crate::error::Error;
use crate::multicodec::{self, KeyType, PublicKey};

/// Prefix shared by every `did:key` identifier.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Construct a `did:key` identifier from raw public key bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyLength`] if the key is the wrong length for its
/// type.
pub fn generate_did_key(public_key: &[u8], key_type: KeyType) -> crate::Result<String> {
    let multi = multicodec::encode_with_type(public_key, key_type)?;
    Ok(format!("{DID_KEY_PREFIX}{multi}"))
}

/// Recover the key type and raw public key bytes from a `did:key` identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] unless the identifier starts with
/// `did:key:`, otherwise any error from [`multicodec::decode_with_type`].
pub fn parse_did_key(did: &str) -> crate::Result<(KeyType, Vec<u8>)> {
    let Some(multi) = did.strip_prefix(DID_KEY_PREFIX) else {
        return Err(Error::InvalidFormat(format!("not a did:key: {did}")));
    };
    multicodec::decode_with_type(multi)
}

/// Expand a `did:key` identifier into its DID document.
///
/// The document holds a single verification method, `did#<multibase>`,
/// listed under every verification relationship.
///
/// # Errors
///
/// Fails if the identifier cannot be parsed.
pub fn document(did: &str) -> crate::Result<Document> {
    document_with_options(did, &CreateOptions::default())
}

/// Expand a `did:key` identifier into its DID document using the supplied
/// options.
///
/// # Errors
///
/// Fails if the identifier cannot be parsed.
pub fn document_with_options(did: &str, options: &CreateOptions) -> crate::Result<Document> {
    let (key_type, bytes) = parse_did_key(did)?;
    let key = PublicKey { key_type, bytes };

    let mut vm = VerificationMethodBuilder::new(key).did(did);
    if options.multikey {
        vm = vm.multikey();
    }
    let vm = vm.build()?;

    let mut builder = DocumentBuilder::with_options(did, options).verification_method(vm.clone());
    for relationship in Relationship::ALL {
        builder = builder.relationship(relationship, &vm.id);
    }
    builder.build()
}
