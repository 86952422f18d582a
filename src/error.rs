//! # Errors
//!
//! Error types shared by the codecs, crypto providers, document model and
//! registries. The DIDAuth verifier reports through its own closed
//! [`crate::auth::AuthError`] so callers never have to inspect an `Error` to
//! build an HTTP response.

use thiserror::Error;

/// Log an error with `tracing` and return it.
///
/// # Example
/// ```
/// use vercre_identity::{tracerr, Error, Result};
///
/// fn with_msg(did: &str) -> Result<()> {
///     tracerr!(Error::NotFound(format!("document for {did}")))
/// }
/// ```
#[macro_export]
macro_rules! tracerr {
    ($err:expr) => {{
        let err: $crate::Error = $err;
        tracing::error!(code = err.code(), "{err}");
        return Err(err);
    }};
}

/// Errors returned by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Input was not in the expected shape.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A multibase string started with a base identifier this crate does not
    /// support.
    #[error("unsupported multibase prefix: {0}")]
    UnsupportedBase(char),

    /// Key bytes started with a multicodec prefix that is not recognised.
    #[error("unknown key type prefix: {0:#06x}")]
    UnknownKeyTypePrefix(u16),

    /// Raw key bytes do not have the length required by their key type.
    #[error("invalid key length for {key_type}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Key type the bytes were checked against.
        key_type: String,
        /// Length required by the key type.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// A compressed elliptic curve point could not be decompressed.
    #[error("invalid compressed key: {0}")]
    InvalidCompressedKey(String),

    /// Key material could not be used by the crypto provider.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The key type is not supported for the requested operation.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The DID is not well-formed or is not valid for the method.
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    /// The DID method is not handled by this registry.
    #[error("method not supported: {0}")]
    MethodNotSupported(String),

    /// A DID document failed structural validation.
    #[error("invalid document: {}", .0.join("; "))]
    InvalidDocument(Vec<String>),

    /// The requested DID document or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A DID document already exists for the DID.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The key used to authorize a mutation does not hold the required
    /// verification relationship.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The first verification method of a `did:key` document cannot be
    /// removed.
    #[error("cannot remove primary key: {0}")]
    CannotRemovePrimaryKey(String),

    /// A signature did not verify.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// A nonce was seen before within the replay window.
    #[error("nonce replayed: {0}")]
    NonceReplayed(String),

    /// A timestamp or token is outside its validity window.
    #[error("expired: {0}")]
    Expired(String),

    /// A WebAuthn challenge was never issued, has expired, or was already
    /// consumed.
    #[error("invalid or expired challenge")]
    InvalidOrExpiredChallenge,

    /// The nonce supplied with an assertion does not match the nonce issued
    /// with its challenge.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// A WebAuthn assertion failed verification.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// Backend or otherwise unexpected failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Stable, machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_format",
            Self::UnsupportedBase(_) => "unsupported_base",
            Self::UnknownKeyTypePrefix(_) => "unknown_key_type_prefix",
            Self::InvalidKeyLength { .. } => "invalid_key_length",
            Self::InvalidCompressedKey(_) => "invalid_compressed_key",
            Self::InvalidKey(_) => "invalid_key",
            Self::UnsupportedKeyType(_) => "unsupported_key_type",
            Self::InvalidDid(_) => "invalid_did",
            Self::MethodNotSupported(_) => "method_not_supported",
            Self::InvalidDocument(_) => "invalid_document",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Unauthorized(_) => "unauthorized",
            Self::CannotRemovePrimaryKey(_) => "cannot_remove_primary_key",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::NonceReplayed(_) => "nonce_replayed",
            Self::Expired(_) => "expired",
            Self::InvalidOrExpiredChallenge => "invalid_or_expired_challenge",
            Self::NonceMismatch => "nonce_mismatch",
            Self::AssertionFailed(_) => "assertion_failed",
            Self::Other(_) => "server_error",
        }
    }

    /// Transfer the error to `OAuth2` compatible format.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.code(),
            "error_description": self.to_string(),
        })
    }
}

impl From<multibase::Error> for Error {
    fn from(err: multibase::Error) -> Self {
        Self::InvalidFormat(format!("multibase: {err}"))
    }
}

impl From<base64ct::Error> for Error {
    fn from(err: base64ct::Error) -> Self {
        Self::InvalidFormat(format!("base64: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(format!("json: {err}"))
    }
}

#[cfg(test)]
mod test {
    use insta::assert_json_snapshot as assert_snapshot;

    use super::*;

    #[test]
    fn primary_key_json() {
        let err = Error::CannotRemovePrimaryKey("did:key:z6Mk#z6Mk".into());
        assert_snapshot!(err.to_json(), @r#"
        {
          "error": "cannot_remove_primary_key",
          "error_description": "cannot remove primary key: did:key:z6Mk#z6Mk"
        }
        "#);
    }

    #[test]
    fn prefix_display() {
        let err = Error::UnknownKeyTypePrefix(0xabcd);
        assert_eq!(err.to_string(), "unknown key type prefix: 0xabcd");
        assert_eq!(err.code(), "unknown_key_type_prefix");
    }

    #[test]
    fn tracerr_returns_error() {
        fn fails() -> crate::Result<()> {
            tracerr!(Error::NonceMismatch)
        }
        let err = fails().expect_err("should fail");
        assert!(matches!(err, Error::NonceMismatch));
    }
}
