//! # Verifiable Data Registry
//!
//! A [`Vdr`] resolves DID documents and applies authorized changes to them.
//! Every mutation names the verification method authorizing it; that method
//! must already be in the document and hold the relationship the mutation
//! requires (see [`DocumentUpdate::required_relationship`]).
//!
//! [`KeyVdr`] is a self-resolving registry for `did:key`. Documents are
//! derived from the key embedded in the DID and any changes are kept in an
//! injected [`DocumentStore`].

mod key;
mod store;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::key::KeyVdr;
pub use self::store::DocumentStore;
use crate::document::{
    CreateOptions, Document, DocumentUpdate, Relationship, Service, VerificationMethod,
};
use crate::error::Error;
use crate::tracerr;

/// Resolves and mutates DID documents for a single DID method.
pub trait Vdr: Send + Sync {
    /// The DID method served, e.g. `key`.
    fn method(&self) -> &str;

    /// Resolve a DID to its document. Returns `None` when the DID is unknown
    /// or cannot be resolved by this registry.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store is unavailable.
    fn resolve(&self, did: &str) -> impl Future<Output = crate::Result<Option<Document>>> + Send;

    /// Returns `true` if the DID resolves.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store is unavailable.
    fn exists(&self, did: &str) -> impl Future<Output = crate::Result<bool>> + Send {
        async move { Ok(self.resolve(did).await?.is_some()) }
    }

    /// Create a DID document. No prior authorization is required.
    ///
    /// # Errors
    ///
    /// Fails if the request is invalid or the DID already exists.
    fn create(&self, request: CreateRequest)
    -> impl Future<Output = crate::Result<Document>> + Send;

    /// Create a document for a user's existing DID on their behalf, with
    /// `authentication` and `capabilityDelegation` preset on the user's key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotSupported`] unless the registry supports
    /// custodial creation.
    fn create_via_custodian(
        &self, request: CustodianRequest,
    ) -> impl Future<Output = crate::Result<Document>> + Send {
        let method = self.method().to_string();
        async move {
            tracerr!(Error::MethodNotSupported(format!(
                "did:{method} does not support custodial creation of {}",
                request.user_did
            )))
        }
    }

    /// Apply an update authorized by `options.key_id`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the DID does not resolve.
    /// - [`Error::Unauthorized`] if the key does not hold the relationship
    ///   required by the update.
    /// - Any error from [`Document::apply`].
    fn update(
        &self, did: &str, update: DocumentUpdate, options: &UpdateOptions,
    ) -> impl Future<Output = crate::Result<Document>> + Send;

    /// Add a verification method holding the given relationships.
    ///
    /// # Errors
    ///
    /// See [`Vdr::update`].
    fn add_verification_method(
        &self, did: &str, method: VerificationMethod, relationships: Vec<Relationship>,
        options: &UpdateOptions,
    ) -> impl Future<Output = crate::Result<Document>> + Send {
        let update = DocumentUpdate::AddVerificationMethod { method, relationships };
        self.update(did, update, options)
    }

    /// Remove a verification method.
    ///
    /// # Errors
    ///
    /// See [`Vdr::update`].
    fn remove_verification_method(
        &self, did: &str, id: &str, options: &UpdateOptions,
    ) -> impl Future<Output = crate::Result<Document>> + Send {
        let update = DocumentUpdate::RemoveVerificationMethod { id: id.to_string() };
        self.update(did, update, options)
    }

    /// Add a service.
    ///
    /// # Errors
    ///
    /// See [`Vdr::update`].
    fn add_service(
        &self, did: &str, service: Service, options: &UpdateOptions,
    ) -> impl Future<Output = crate::Result<Document>> + Send {
        self.update(did, DocumentUpdate::AddService { service }, options)
    }

    /// Remove a service.
    ///
    /// # Errors
    ///
    /// See [`Vdr::update`].
    fn remove_service(
        &self, did: &str, id: &str, options: &UpdateOptions,
    ) -> impl Future<Output = crate::Result<Document>> + Send {
        let update = DocumentUpdate::RemoveService { id: id.to_string() };
        self.update(did, update, options)
    }

    /// Add and remove relationships held by a verification method.
    ///
    /// # Errors
    ///
    /// See [`Vdr::update`].
    fn update_relationships(
        &self, did: &str, id: &str, add: Vec<Relationship>, remove: Vec<Relationship>,
        options: &UpdateOptions,
    ) -> impl Future<Output = crate::Result<Document>> + Send {
        let update = DocumentUpdate::UpdateRelationships {
            id: id.to_string(),
            add,
            remove,
        };
        self.update(did, update, options)
    }
}

/// Request to create a DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// The controlling public key as prefixed multibase.
    pub public_key_multibase: String,

    /// The DID the caller expects. Creation fails if the registry would
    /// assign a different one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_did: Option<String>,

    /// Relationships for the controlling key. Every relationship when empty.
    #[serde(default)]
    pub relationships: Vec<Relationship>,

    /// Services to add.
    #[serde(default)]
    pub services: Vec<Service>,

    /// Document creation options.
    #[serde(skip)]
    pub options: Option<CreateOptions>,
}

/// Request to create a document for a user's existing DID.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodianRequest {
    /// The user's DID.
    pub user_did: String,

    /// Services to add.
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Options for an update.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    /// The verification method authorizing the update. Fragments (`#key-1`)
    /// are resolved against the DID being updated.
    pub key_id: String,
}

impl UpdateOptions {
    /// Options authorized by `key_id`.
    #[must_use]
    pub fn new(key_id: impl Into<String>) -> Self {
        Self { key_id: key_id.into() }
    }
}

/// Check that `key_id` is a verification method of the document holding the
/// `required` relationship.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] otherwise.
pub fn authorize(doc: &Document, key_id: &str, required: Relationship) -> crate::Result<()> {
    if doc.verification_method(key_id).is_none() {
        tracerr!(Error::Unauthorized(format!("{key_id} is not a verification method of {}", doc.id)));
    }
    if !doc.has_relationship(key_id, required) {
        tracerr!(Error::Unauthorized(format!("{key_id} does not hold {required}")));
    }
    Ok(())
}

/// Outcome of a create or update for callers that report failures as data.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    /// `true` when the registry accepted the change.
    pub success: bool,

    /// The resulting document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_document: Option<Document>,

    /// The error, as `{error, error_description}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl From<crate::Result<Document>> for MutationResult {
    fn from(result: crate::Result<Document>) -> Self {
        match result {
            Ok(doc) => Self {
                success: true,
                did_document: Some(doc),
                error: None,
            },
            Err(e) => Self {
                success: false,
                did_document: None,
                error: Some(e.to_json()),
            },
        }
    }
}
