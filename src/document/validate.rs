//! Structural validation of DID documents.
//!
//! Validation accumulates every violation rather than stopping at the first.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{Document, Relationship};
use crate::core::OneMany;
use crate::error::Error;

static DID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^did:[a-z0-9]+:[A-Za-z0-9._%-]+(:[A-Za-z0-9._%-]+)*$").expect("should compile")
});

/// Returns `true` if the string has the shape of a DID (no path, query or
/// fragment).
#[must_use]
pub fn is_did(s: &str) -> bool {
    DID_REGEX.is_match(s)
}

/// A single structural violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "code", content = "detail")]
pub enum ValidationError {
    /// The document has no `id`.
    MissingId,

    /// The `id` is not a DID.
    InvalidId(String),

    /// The document has no `@context`.
    MissingContext,

    /// `@context` is a single value rather than an array.
    ContextNotArray,

    /// The document has no verification methods.
    NoVerificationMethod,

    /// A verification method has no `id`.
    MissingMethodId,

    /// Two verification methods share an `id`.
    DuplicateMethodId(String),

    /// A verification method has no `type`.
    MissingMethodType(String),

    /// A verification method has no `controller`.
    MissingMethodController(String),

    /// A service has no `type`.
    MissingServiceType(String),

    /// A service has no `serviceEndpoint`.
    MissingServiceEndpoint(String),

    /// Two services share an `id`.
    DuplicateServiceId(String),

    /// A relationship lists an ID that is not a verification method of the
    /// document.
    DanglingReference {
        /// The relationship holding the reference.
        relationship: Relationship,
        /// The missing verification method ID.
        id: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "document id is missing"),
            Self::InvalidId(id) => write!(f, "document id is not a DID: {id}"),
            Self::MissingContext => write!(f, "@context is missing"),
            Self::ContextNotArray => write!(f, "@context must be an array"),
            Self::NoVerificationMethod => write!(f, "at least one verificationMethod is required"),
            Self::MissingMethodId => write!(f, "verificationMethod is missing an id"),
            Self::DuplicateMethodId(id) => write!(f, "duplicate verificationMethod id: {id}"),
            Self::MissingMethodType(id) => write!(f, "verificationMethod {id} is missing a type"),
            Self::MissingMethodController(id) => {
                write!(f, "verificationMethod {id} is missing a controller")
            }
            Self::MissingServiceType(id) => write!(f, "service {id} is missing a type"),
            Self::MissingServiceEndpoint(id) => {
                write!(f, "service {id} is missing a serviceEndpoint")
            }
            Self::DuplicateServiceId(id) => write!(f, "duplicate service id: {id}"),
            Self::DanglingReference { relationship, id } => {
                write!(f, "{relationship} references unknown verificationMethod {id}")
            }
        }
    }
}

/// Outcome of validating a document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// `true` when `errors` is empty.
    pub is_valid: bool,

    /// Every violation found.
    pub errors: Vec<ValidationError>,
}

impl From<ValidationReport> for Error {
    fn from(report: ValidationReport) -> Self {
        Self::InvalidDocument(report.errors.iter().map(ToString::to_string).collect())
    }
}

/// Validate a DID document's structural invariants.
#[must_use]
pub fn validate(doc: &Document) -> ValidationReport {
    let mut errors = vec![];

    if doc.id.is_empty() {
        errors.push(ValidationError::MissingId);
    } else if !is_did(&doc.id) {
        errors.push(ValidationError::InvalidId(doc.id.clone()));
    }

    match &doc.context {
        OneMany::Many(ctx) if ctx.is_empty() => errors.push(ValidationError::MissingContext),
        OneMany::One(_) => errors.push(ValidationError::ContextNotArray),
        OneMany::Many(_) => {}
    }

    if doc.verification_method.is_empty() {
        errors.push(ValidationError::NoVerificationMethod);
    }
    let mut method_ids = HashSet::new();
    for vm in &doc.verification_method {
        if vm.id.is_empty() {
            errors.push(ValidationError::MissingMethodId);
        } else if !method_ids.insert(doc.absolute_id(&vm.id)) {
            errors.push(ValidationError::DuplicateMethodId(vm.id.clone()));
        }
        if vm.type_.is_empty() {
            errors.push(ValidationError::MissingMethodType(vm.id.clone()));
        }
        if vm.controller.is_empty() {
            errors.push(ValidationError::MissingMethodController(vm.id.clone()));
        }
    }

    let mut service_ids = HashSet::new();
    for service in &doc.service {
        if !service_ids.insert(doc.absolute_id(&service.id)) {
            errors.push(ValidationError::DuplicateServiceId(service.id.clone()));
        }
        if service.type_.is_empty() {
            errors.push(ValidationError::MissingServiceType(service.id.clone()));
        }
        if service.service_endpoint.is_empty() {
            errors.push(ValidationError::MissingServiceEndpoint(service.id.clone()));
        }
    }

    for relationship in Relationship::ALL {
        for id in doc.relationship(relationship) {
            if !method_ids.contains(&doc.absolute_id(id)) {
                errors.push(ValidationError::DanglingReference {
                    relationship,
                    id: id.clone(),
                });
            }
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    const DID: &str = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";

    fn valid() -> serde_json::Value {
        let kid = format!("{DID}#z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK");
        json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": DID,
            "verificationMethod": [{
                "id": kid,
                "type": "Ed25519VerificationKey2020",
                "controller": DID,
                "publicKeyMultibase": "z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
            }],
            "authentication": [kid],
            "capabilityDelegation": [kid],
            "service": [{
                "id": format!("{DID}#hub"),
                "type": "DIDCommMessaging",
                "serviceEndpoint": "https://hub.example"
            }]
        })
    }

    fn report(value: serde_json::Value) -> ValidationReport {
        let doc: Document = serde_json::from_value(value).expect("should deserialize");
        validate(&doc)
    }

    #[test]
    fn self_consistent() {
        let report = report(valid());
        assert!(report.is_valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn missing_id() {
        let mut value = valid();
        value.as_object_mut().expect("object").remove("id");
        assert_eq!(report(value).errors, vec![ValidationError::MissingId]);
    }

    #[test]
    fn malformed_id() {
        let mut value = valid();
        value["id"] = json!("not-a-did");
        assert!(report(value).errors.contains(&ValidationError::InvalidId("not-a-did".into())));
    }

    #[test]
    fn missing_context() {
        let mut value = valid();
        value.as_object_mut().expect("object").remove("@context");
        assert_eq!(report(value).errors, vec![ValidationError::MissingContext]);
    }

    #[test]
    fn context_not_array() {
        let mut value = valid();
        value["@context"] = json!("https://www.w3.org/ns/did/v1");
        assert_eq!(report(value).errors, vec![ValidationError::ContextNotArray]);
    }

    #[test]
    fn empty_verification_method() {
        let mut value = valid();
        value["verificationMethod"] = json!([]);
        let report = report(value);
        assert!(!report.is_valid);
        assert!(report.errors.contains(&ValidationError::NoVerificationMethod));
    }

    #[test]
    fn dangling_reference() {
        let mut value = valid();
        value["authentication"] = json!([format!("{DID}#missing")]);
        assert_eq!(
            report(value).errors,
            vec![ValidationError::DanglingReference {
                relationship: Relationship::Authentication,
                id: format!("{DID}#missing"),
            }]
        );
    }

    #[test]
    fn relative_ids() {
        let value = json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": DID,
            "verificationMethod": [{
                "id": "#key-1",
                "type": "Ed25519VerificationKey2020",
                "controller": DID,
                "publicKeyMultibase": "z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
            }],
            "authentication": ["#key-1"],
            "assertionMethod": [format!("{DID}#key-1")]
        });
        let doc: Document = serde_json::from_value(value).expect("should deserialize");

        let report = validate(&doc);
        assert!(report.is_valid, "{:?}", report.errors);
        assert!(doc.verification_method("#key-1").is_some());
        assert!(doc.verification_method(&format!("{DID}#key-1")).is_some());
        assert!(doc.has_relationship(&format!("{DID}#key-1"), Relationship::Authentication));
        assert!(doc.has_relationship("#key-1", Relationship::AssertionMethod));
    }

    #[test]
    fn relative_and_absolute_duplicates() {
        let mut value = valid();
        let mut duplicate = value["verificationMethod"][0].clone();
        duplicate["id"] = json!("#z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK");
        value["verificationMethod"].as_array_mut().expect("array").push(duplicate);

        let id = "#z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
        assert_eq!(report(value).errors, vec![ValidationError::DuplicateMethodId(id.into())]);
    }

    #[test]
    fn accumulates_all_errors() {
        let mut value = valid();
        value.as_object_mut().expect("object").remove("id");
        value["@context"] = json!([]);
        value["verificationMethod"][0]["controller"] = json!("");
        value["service"][0]["type"] = json!("");

        let report = report(value);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 4, "{:?}", report.errors);
    }

    #[test]
    fn did_shape() {
        assert!(is_did(DID));
        assert!(is_did("did:web:example.com:users:alice"));
        assert!(!is_did("did:key:"));
        assert!(!is_did(&format!("{DID}#key-1")));
        assert!(!is_did("urn:uuid:1234"));
    }
}
