//! Updates to DID documents.
//!
//! Each kind of update names the verification relationship a key must hold to
//! authorize it. Updates are applied to a copy of the document, which is
//! validated before it is returned, so a failed update never leaves a
//! partially modified document behind.

use serde::{Deserialize, Serialize};

use super::{Document, Relationship, Service, VerificationMethod, absolute_id};
use crate::error::Error;

/// A single mutation of a DID document.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum DocumentUpdate {
    /// Add a verification method and list it under the given relationships.
    #[serde(rename_all = "camelCase")]
    AddVerificationMethod {
        /// The method to add.
        method: VerificationMethod,
        /// Relationships the new method should hold.
        relationships: Vec<Relationship>,
    },

    /// Remove a verification method and every relationship entry referring to
    /// it.
    RemoveVerificationMethod {
        /// ID of the method to remove.
        id: String,
    },

    /// Add a service.
    AddService {
        /// The service to add.
        service: Service,
    },

    /// Remove a service.
    RemoveService {
        /// ID of the service to remove.
        id: String,
    },

    /// Add and remove relationships held by an existing verification method.
    UpdateRelationships {
        /// ID of the verification method.
        id: String,
        /// Relationships to add.
        add: Vec<Relationship>,
        /// Relationships to remove.
        remove: Vec<Relationship>,
    },
}

impl DocumentUpdate {
    /// The relationship the authorizing key must hold.
    #[must_use]
    pub const fn required_relationship(&self) -> Relationship {
        match self {
            Self::AddService { .. } | Self::RemoveService { .. } => {
                Relationship::CapabilityInvocation
            }
            Self::AddVerificationMethod { .. }
            | Self::RemoveVerificationMethod { .. }
            | Self::UpdateRelationships { .. } => Relationship::CapabilityDelegation,
        }
    }
}

impl Document {
    /// Apply an update, returning the updated document. `self` is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::CannotRemovePrimaryKey`] when removing the first method of a
    ///   `did:key` document.
    /// - [`Error::NotFound`] when the targeted method or service is missing.
    /// - [`Error::AlreadyExists`] when adding a method or service whose ID is
    ///   taken.
    /// - [`Error::InvalidDocument`] when the result fails validation.
    pub fn apply(&self, update: &DocumentUpdate) -> crate::Result<Self> {
        let mut doc = self.clone();
        let did = doc.id.clone();

        match update {
            DocumentUpdate::AddVerificationMethod { method, relationships } => {
                let mut method = method.clone();
                method.id = doc.absolute_id(&method.id);
                if doc.verification_method(&method.id).is_some() {
                    return Err(Error::AlreadyExists(method.id));
                }
                method.public_key()?;

                for relationship in relationships {
                    doc.relationship_mut(*relationship).push(method.id.clone());
                }
                doc.verification_method.push(method);
            }
            DocumentUpdate::RemoveVerificationMethod { id } => {
                let id = doc.absolute_id(id);
                let Some(pos) =
                    doc.verification_method.iter().position(|vm| absolute_id(&did, &vm.id) == id)
                else {
                    return Err(Error::NotFound(format!("verification method {id}")));
                };
                if pos == 0 && doc.id.starts_with("did:key:") {
                    return Err(Error::CannotRemovePrimaryKey(id));
                }

                doc.verification_method.remove(pos);
                for relationship in Relationship::ALL {
                    doc.relationship_mut(relationship).retain(|r| absolute_id(&did, r) != id);
                }
            }
            DocumentUpdate::AddService { service } => {
                let mut service = service.clone();
                service.id = doc.absolute_id(&service.id);
                if doc.service(&service.id).is_some() {
                    return Err(Error::AlreadyExists(service.id));
                }
                doc.service.push(service);
            }
            DocumentUpdate::RemoveService { id } => {
                let id = doc.absolute_id(id);
                let before = doc.service.len();
                doc.service.retain(|s| absolute_id(&did, &s.id) != id);
                if doc.service.len() == before {
                    return Err(Error::NotFound(format!("service {id}")));
                }
            }
            DocumentUpdate::UpdateRelationships { id, add, remove } => {
                let id = doc.absolute_id(id);
                if doc.verification_method(&id).is_none() {
                    return Err(Error::NotFound(format!("verification method {id}")));
                }
                for relationship in remove {
                    doc.relationship_mut(*relationship).retain(|r| absolute_id(&did, r) != id);
                }
                for relationship in add {
                    if !doc.has_relationship(&id, *relationship) {
                        doc.relationship_mut(*relationship).push(id.clone());
                    }
                }
            }
        }

        let report = doc.validate();
        if !report.is_valid {
            return Err(report.into());
        }
        Ok(doc)
    }
}
