//! # DIDAuth v1
//!
//! Stateless request authentication with DIDs. A signer signs a canonical
//! serialization of the request's `signed_data` (caller fields plus a fresh
//! nonce and timestamp) and sends it, with the signature, either in an
//! `Authorization: DIDAuthV1 <token>` header or embedded in a request body.
//!
//! A [`Verifier`] checks freshness, rejects replayed nonces, resolves the
//! signer's DID through a [`crate::vdr::Vdr`], and checks the named key holds
//! the required relationship before verifying the signature.

mod nonce;
mod signer;
mod verifier;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::nonce::NonceCache;
pub use self::signer::{LocalSigner, Signer, new_nonce, sign, sign_payload};
pub use self::verifier::{Verifier, VerifyOptions};

/// Authorization scheme name.
pub const AUTH_SCHEME: &str = "DIDAuthV1";

/// The signed part of a request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignedData {
    /// Request fields supplied by the caller.
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Unique per signer and key within the replay window.
    pub nonce: String,

    /// Unix timestamp, in seconds, at signing.
    pub timestamp: i64,
}

impl SignedData {
    /// The bytes that are signed: JSON with object keys sorted at every level
    /// and no insignificant whitespace.
    ///
    /// # Errors
    ///
    /// Fails if the data cannot be serialized.
    pub fn canonical_bytes(&self) -> crate::Result<Vec<u8>> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_vec(&canonicalize(value))?)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Signature over [`SignedData`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DidSignature {
    /// DID of the signer.
    pub signer_did: String,

    /// Verification method used to sign, as a DID URL or a fragment of the
    /// signer's DID.
    pub key_id: String,

    /// Base64url-encoded signature.
    pub value: String,
}

/// A signed request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignedObject {
    /// The signed data.
    pub signed_data: SignedData,

    /// The signature.
    pub signature: DidSignature,
}

impl SignedObject {
    /// Encode as an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Fails if the object cannot be serialized.
    pub fn to_header(&self) -> crate::Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{AUTH_SCHEME} {}", Base64UrlUnpadded::encode_string(&json)))
    }

    /// Decode from an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ParseError`] if the value does not use the
    /// `DIDAuthV1` scheme or cannot be decoded.
    pub fn from_header(header: &str) -> Result<Self, AuthError> {
        let Some(token) = header.strip_prefix(AUTH_SCHEME).and_then(|t| t.strip_prefix(' ')) else {
            return Err(AuthError::ParseError(format!("expected {AUTH_SCHEME} scheme")));
        };
        let json = Base64UrlUnpadded::decode_vec(token.trim())
            .map_err(|e| AuthError::ParseError(format!("token is not base64url: {e}")))?;
        serde_json::from_slice(&json).map_err(|e| AuthError::ParseError(format!("token: {e}")))
    }
}

/// What a verifier accepts: an `Authorization` header value or an object
/// taken from a request body.
#[derive(Clone, Copy, Debug)]
pub enum AuthInput<'a> {
    /// `DIDAuthV1 <token>`.
    Header(&'a str),

    /// An already-parsed object.
    Object(&'a SignedObject),
}

impl<'a> From<&'a str> for AuthInput<'a> {
    fn from(header: &'a str) -> Self {
        Self::Header(header)
    }
}

impl<'a> From<&'a String> for AuthInput<'a> {
    fn from(header: &'a String) -> Self {
        Self::Header(header)
    }
}

impl<'a> From<&'a SignedObject> for AuthInput<'a> {
    fn from(object: &'a SignedObject) -> Self {
        Self::Object(object)
    }
}

/// A successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verified {
    /// DID of the signer.
    pub signer_did: String,

    /// The verification method that signed, as a full DID URL.
    pub key_id: String,
}

/// Reasons a request fails verification.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// The header or object is malformed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The timestamp is outside the acceptance window.
    #[error("timestamp {timestamp} is outside the window around {now}")]
    TimestampOutOfWindow {
        /// The signed timestamp.
        timestamp: i64,
        /// The verifier's clock.
        now: i64,
    },

    /// The nonce was already used by the signer and key.
    #[error("nonce replayed: {0}")]
    NonceReplayed(String),

    /// The signer's DID does not resolve.
    #[error("DID not found: {0}")]
    DidNotFound(String),

    /// The signing key is not in the signer's document.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The signing key does not hold the required relationship.
    #[error("key permission denied: {0}")]
    KeyPermissionDenied(String),

    /// No crypto provider handles the key.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The signature does not verify.
    #[error("signature invalid")]
    SignatureInvalid,

    /// The DID could not be resolved because the registry failed.
    #[error("resolver unavailable: {0}")]
    ResolverUnavailable(String),
}

impl AuthError {
    /// Stable, machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "parse_error",
            Self::TimestampOutOfWindow { .. } => "timestamp_out_of_window",
            Self::NonceReplayed(_) => "nonce_replayed",
            Self::DidNotFound(_) => "did_not_found",
            Self::KeyNotFound(_) => "key_not_found",
            Self::KeyPermissionDenied(_) => "key_permission_denied",
            Self::UnsupportedKeyType(_) => "unsupported_key_type",
            Self::SignatureInvalid => "signature_invalid",
            Self::ResolverUnavailable(_) => "resolver_unavailable",
        }
    }

    /// HTTP status class for the failure.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::KeyPermissionDenied(_) => 403,
            Self::ResolverUnavailable(_) => 503,
            _ => 401,
        }
    }

    /// Returns `true` when the failure is on the verifier's side and the same
    /// request may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ResolverUnavailable(_))
    }
}

/// Verification outcome in the shape HTTP middleware reports.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResult {
    /// `true` if the request verified.
    pub is_valid: bool,

    /// The signer's DID, when verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,

    /// The error code, when not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<Verified, AuthError>> for VerifyResult {
    fn from(result: Result<Verified, AuthError>) -> Self {
        match result {
            Ok(verified) => Self {
                is_valid: true,
                did: Some(verified.signer_did),
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                did: None,
                error: Some(e.code().to_string()),
            },
        }
    }
}
