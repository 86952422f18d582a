//! # Identity
//!
//! Decentralized identifiers and the authentication built on them.
//!
//! - [`multibase`] and [`multicodec`] encode public keys as self-describing
//!   strings, and [`key`] turns them into `did:key` identifiers and documents.
//! - [`crypto`] signs and verifies with Ed25519, secp256k1 and P-256 keys.
//! - [`document`] models, validates and updates DID documents.
//! - [`vdr`] resolves and mutates documents, with [`vdr::KeyVdr`] serving
//!   `did:key` from memory.
//! - [`auth`] signs and verifies `DIDAuthV1` requests.
//! - [`webauthn`] and [`onboarding`] let a user prove control of a `did:key`
//!   with a platform authenticator and have a document created for them.
//!
//! # Example
//!
//! ```rust,no_run
//! use vercre_identity::auth::{LocalSigner, Verifier, sign_payload};
//! use vercre_identity::vdr::KeyVdr;
//! use vercre_identity::KeyType;
//!
//! # async fn run() -> vercre_identity::Result<()> {
//! let signer = LocalSigner::generate(KeyType::Ed25519)?;
//!
//! let mut payload = serde_json::Map::new();
//! payload.insert("operation".into(), "ping".into());
//! let signed = sign_payload(payload, &signer).await?;
//!
//! let verifier = Verifier::new(KeyVdr::default());
//! let verified = verifier.verify(&signed).await.expect("should verify");
//! assert_eq!(verified.signer_did, signed.signature.signer_did);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod core;
pub mod crypto;
pub mod document;
pub mod error;
pub mod key;
pub mod multibase;
pub mod multicodec;
pub mod onboarding;
pub mod vdr;
pub mod webauthn;

pub use self::document::{Document, Relationship, Service, VerificationMethod};
pub use self::error::Error;
pub use self::key::{generate_did_key, parse_did_key};
pub use self::multicodec::{KeyType, PublicKey};

/// Result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
