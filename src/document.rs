//! # DID Document
//!
//! A DID Document is a JSON-LD document that contains information related to a
//! DID.
//!
//! See [Decentralized Identifiers (DIDs) v1.0](https://www.w3.org/TR/did-1.0/)

mod update;
mod validate;

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::update::DocumentUpdate;
pub use self::validate::{ValidationError, ValidationReport, is_did, validate};
use crate::core::{Kind, OneMany};
use crate::error::Error;
use crate::multicodec::{KeyType, PublicKey};

/// Default contexts added to a DID document.
pub const CONTEXT: [&str; 2] =
    ["https://www.w3.org/ns/did/v1", "https://w3id.org/security/multikey/v1"];

/// Verification method type for keys whose type is carried by the multicodec
/// prefix of the key itself.
pub const MULTIKEY: &str = "Multikey";

/// DID Document
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The context of the DID document. MUST be an array.
    #[serde(rename = "@context", default)]
    pub context: OneMany<Kind<Value>>,

    /// The DID for a particular DID subject.
    ///
    /// The subject is defined as the entity identified by the DID and described
    /// by the DID document.
    #[serde(default)]
    pub id: String,

    /// One or more DIDs whose verification methods are accepted as
    /// authoritative for this DID subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<OneMany<String>>,

    /// Verification methods for the DID subject. For `did:key` documents, the
    /// first entry is the key the DID was derived from.
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,

    /// The `authentication` verification relationship is used to specify how
    /// the DID subject is expected to be authenticated, for purposes such
    /// as logging into a website or in any sort of challenge-response
    /// protocol.
    ///
    /// <https://www.w3.org/TR/did-core/#authentication>
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    /// The `assertion_method` verification relationship is used to specify how
    /// the DID subject is expected to express claims.
    ///
    /// <https://www.w3.org/TR/did-core/#assertion>
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,

    /// The `capability_invocation` verification relationship. Keys listed here
    /// may edit the document's services.
    ///
    /// <https://www.w3.org/TR/did-core/#capability-invocation>
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,

    /// The `capability_delegation` verification relationship. Keys listed here
    /// may edit the document's verification methods and relationships.
    ///
    /// <https://www.w3.org/TR/did-core/#capability-delegation>
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,

    /// A set of services, that express ways of communicating with the DID
    /// subject or related entities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl Document {
    /// Retrieve a verification method by its ID. Relative IDs (`#key-1`) are
    /// resolved against the document's DID.
    #[must_use]
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        let id = self.absolute_id(id);
        self.verification_method.iter().find(|vm| self.absolute_id(&vm.id) == id)
    }

    /// Retrieve a service by its ID.
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&Service> {
        let id = self.absolute_id(id);
        self.service.iter().find(|s| self.absolute_id(&s.id) == id)
    }

    /// The verification method IDs listed under a relationship.
    #[must_use]
    pub fn relationship(&self, relationship: Relationship) -> &[String] {
        match relationship {
            Relationship::Authentication => &self.authentication,
            Relationship::AssertionMethod => &self.assertion_method,
            Relationship::CapabilityInvocation => &self.capability_invocation,
            Relationship::CapabilityDelegation => &self.capability_delegation,
        }
    }

    /// Mutable access to the verification method IDs listed under a
    /// relationship.
    pub fn relationship_mut(&mut self, relationship: Relationship) -> &mut Vec<String> {
        match relationship {
            Relationship::Authentication => &mut self.authentication,
            Relationship::AssertionMethod => &mut self.assertion_method,
            Relationship::CapabilityInvocation => &mut self.capability_invocation,
            Relationship::CapabilityDelegation => &mut self.capability_delegation,
        }
    }

    /// Returns `true` if the verification method holds the relationship.
    #[must_use]
    pub fn has_relationship(&self, id: &str, relationship: Relationship) -> bool {
        let id = self.absolute_id(id);
        self.relationship(relationship).iter().any(|r| self.absolute_id(r) == id)
    }

    /// The self-certifying key of a `did:key` document.
    #[must_use]
    pub fn primary_key(&self) -> Option<&VerificationMethod> {
        self.verification_method.first()
    }

    /// Validate the document's structural invariants.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        validate(self)
    }

    /// Expand a fragment-only ID into a full DID URL.
    #[must_use]
    pub fn absolute_id(&self, id: &str) -> String {
        absolute_id(&self.id, id)
    }
}

/// Expand a fragment-only ID into a full DID URL of `did`.
pub(crate) fn absolute_id(did: &str, id: &str) -> String {
    if id.starts_with('#') { format!("{did}{id}") } else { id.to_string() }
}

/// Verification relationships a verification method may hold.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Relationship {
    /// Authenticate as the DID subject.
    Authentication,

    /// Issue claims on behalf of the DID subject.
    AssertionMethod,

    /// Invoke capabilities, such as editing the document's services.
    CapabilityInvocation,

    /// Delegate capabilities, such as editing the document's keys.
    CapabilityDelegation,
}

impl Relationship {
    /// Every verification relationship.
    pub const ALL: [Self; 4] = [
        Self::Authentication,
        Self::AssertionMethod,
        Self::CapabilityInvocation,
        Self::CapabilityDelegation,
    ];
}

impl Display for Relationship {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::AssertionMethod => write!(f, "assertionMethod"),
            Self::CapabilityInvocation => write!(f, "capabilityInvocation"),
            Self::CapabilityDelegation => write!(f, "capabilityDelegation"),
        }
    }
}

impl FromStr for Relationship {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.to_string() == s)
            .ok_or_else(|| Error::InvalidFormat(format!("unknown relationship: {s}")))
    }
}

/// A DID document can express verification methods, such as cryptographic
/// public keys, which can be used to authenticate or authorize interactions
/// with the DID subject or associated parties.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// A DID URL that identifies the verification method.
    #[serde(default)]
    pub id: String,

    /// The type of verification method, e.g. `Ed25519VerificationKey2020` or
    /// `Multikey`.
    #[serde(rename = "type", default)]
    pub type_: String,

    /// The DID of the controller of the verification method.
    #[serde(default)]
    pub controller: String,

    /// The public key encoded as prefixed multibase.
    #[serde(default)]
    pub public_key_multibase: String,
}

impl VerificationMethod {
    /// Infer the DID from the key ID.
    #[must_use]
    pub fn did(&self) -> &str {
        self.id.split('#').next().unwrap_or_default()
    }

    /// Decode the public key material, checking it against the declared
    /// method type.
    ///
    /// # Errors
    ///
    /// Fails if the key cannot be decoded, the method type is not supported,
    /// or the declared type disagrees with the key's multicodec prefix.
    pub fn public_key(&self) -> crate::Result<PublicKey> {
        let key = PublicKey::from_multibase(&self.public_key_multibase)?;
        if self.type_ != MULTIKEY {
            let declared = KeyType::from_str(&self.type_)?;
            if declared != key.key_type {
                return Err(Error::InvalidKey(format!(
                    "{} declares {declared} but carries a {} key",
                    self.id, key.key_type
                )));
            }
        }
        Ok(key)
    }
}

/// A builder for creating a verification method.
#[derive(Default)]
pub struct VerificationMethodBuilder {
    key: Option<PublicKey>,
    did: String,
    controller: Option<String>,
    key_id: KeyId,
    multikey: bool,
}

impl VerificationMethodBuilder {
    /// Creates a new `VerificationMethodBuilder` with the given public key.
    #[must_use]
    pub fn new(key: PublicKey) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    /// The DID the verification method belongs to.
    #[must_use]
    pub fn did(mut self, did: impl Into<String>) -> Self {
        self.did = did.into();
        self
    }

    /// Controller of the method. Defaults to the DID.
    #[must_use]
    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    /// Specify how to construct the key ID.
    #[must_use]
    pub fn key_id(mut self, key_id: KeyId) -> Self {
        self.key_id = key_id;
        self
    }

    /// Use the generic `Multikey` type rather than the key-type specific one.
    #[must_use]
    pub const fn multikey(mut self) -> Self {
        self.multikey = true;
        self
    }

    /// Build the verification method.
    ///
    /// # Errors
    ///
    /// Will fail if no key was supplied or the key cannot be multibase
    /// encoded.
    pub fn build(self) -> crate::Result<VerificationMethod> {
        let Some(key) = self.key else {
            return Err(Error::InvalidKey("verification method requires a key".into()));
        };
        let multibase = key.to_multibase()?;
        let fragment = match self.key_id {
            KeyId::Multibase => multibase.clone(),
            KeyId::Fragment(fragment) => fragment,
        };
        let type_ =
            if self.multikey { MULTIKEY.to_string() } else { key.key_type.method_type().to_string() };

        Ok(VerificationMethod {
            id: format!("{}#{fragment}", self.did),
            type_,
            controller: self.controller.unwrap_or_else(|| self.did.clone()),
            public_key_multibase: multibase,
        })
    }
}

/// Instruction to the `VerificationMethodBuilder` on how to construct the key
/// ID.
#[derive(Default)]
pub enum KeyId {
    /// Use the multibase-encoded key as the fragment (the `did:key`
    /// convention).
    #[default]
    Multibase,

    /// Use the supplied fragment, e.g. `key-1`.
    Fragment(String),
}

/// Services are used to express ways of communicating with the DID subject or
/// associated entities.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// A URI unique to the service.
    #[serde(default)]
    pub id: String,

    /// The service type.
    #[serde(rename = "type", default)]
    pub type_: String,

    /// One or more endpoints for the service.
    #[serde(default)]
    pub service_endpoint: OneMany<Kind<Value>>,
}

impl Service {
    /// Create a service with a single URL endpoint.
    #[must_use]
    pub fn new(
        id: impl Into<String>, type_: impl Into<String>, endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            type_: type_.into(),
            service_endpoint: OneMany::One(Kind::String(endpoint.into())),
        }
    }
}

/// Options that can be provided when creating a DID document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptions {
    /// Contexts for the DID document.
    pub context: Vec<String>,

    /// Use `Multikey` as the verification method type.
    pub multikey: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            context: CONTEXT.iter().map(ToString::to_string).collect(),
            multikey: false,
        }
    }
}

/// DID Document builder.
#[derive(Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Creates a new `DocumentBuilder` for the given DID, using default
    /// contexts.
    #[must_use]
    pub fn new(did: impl Into<String>) -> Self {
        Self::with_options(did, &CreateOptions::default())
    }

    /// Creates a new `DocumentBuilder` with explicit options.
    #[must_use]
    pub fn with_options(did: impl Into<String>, options: &CreateOptions) -> Self {
        let context = options.context.iter().map(|c| Kind::String(c.clone())).collect();
        Self {
            document: Document {
                context: OneMany::Many(context),
                id: did.into(),
                ..Document::default()
            },
        }
    }

    /// Add a controller.
    ///
    /// Chain to add multiple controllers.
    #[must_use]
    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        match self.document.controller.as_mut() {
            Some(c) => c.add(controller.into()),
            None => self.document.controller = Some(OneMany::Many(vec![controller.into()])),
        }
        self
    }

    /// Add a verification method.
    #[must_use]
    pub fn verification_method(mut self, vm: VerificationMethod) -> Self {
        self.document.verification_method.push(vm);
        self
    }

    /// Add a verification method ID to a relationship.
    #[must_use]
    pub fn relationship(mut self, relationship: Relationship, id: impl Into<String>) -> Self {
        let id = self.document.absolute_id(&id.into());
        let ids = self.document.relationship_mut(relationship);
        if !ids.contains(&id) {
            ids.push(id);
        }
        self
    }

    /// Add a verification method ID to the `authentication` relationship.
    #[must_use]
    pub fn authentication(self, id: impl Into<String>) -> Self {
        self.relationship(Relationship::Authentication, id)
    }

    /// Add a verification method ID to the `capability_delegation`
    /// relationship.
    #[must_use]
    pub fn capability_delegation(self, id: impl Into<String>) -> Self {
        self.relationship(Relationship::CapabilityDelegation, id)
    }

    /// Add a service endpoint.
    ///
    /// Chain to add multiple service endpoints.
    #[must_use]
    pub fn service(mut self, service: Service) -> Self {
        self.document.service.push(service);
        self
    }

    /// Build and validate the DID Document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] listing every violation found.
    pub fn build(self) -> crate::Result<Document> {
        let report = validate(&self.document);
        if !report.is_valid {
            return Err(report.into());
        }
        Ok(self.document)
    }
}
