//! # WebAuthn Bridge
//!
//! Proves control of a `did:key` with a platform authenticator assertion.
//!
//! The bridge issues single-use challenges, each bound to a nonce. To verify
//! an assertion it recovers the public key from the user's `did:key`,
//! re-encodes it as the COSE key the assertion verifier expects, and on
//! success consumes the challenge and issues a short-lived [`IdToken`].

pub mod cose;

mod challenge;
mod native;

use std::future::Future;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub use self::challenge::{Challenge, ChallengeStore};
pub use self::native::NativeAssertionVerifier;
use crate::error::Error;
use crate::key::parse_did_key;
use crate::tracerr;

/// A WebAuthn assertion (`PublicKeyCredential` from `navigator.credentials.get`)
/// with binary fields base64url encoded.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertion {
    /// Credential ID.
    #[serde(default)]
    pub id: String,

    /// Credential type, `public-key`.
    #[serde(rename = "type", default)]
    pub type_: String,

    /// The authenticator's response.
    pub response: AssertionResponse,
}

/// The authenticator's assertion response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    /// Base64url-encoded client data JSON.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,

    /// Base64url-encoded authenticator data.
    pub authenticator_data: String,

    /// Base64url-encoded signature.
    pub signature: String,

    /// Base64url-encoded user handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

/// Client data collected by the browser.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    /// `webauthn.get` for assertions.
    #[serde(rename = "type")]
    pub type_: String,

    /// The challenge, base64url encoded.
    pub challenge: String,

    /// Origin of the requesting page.
    pub origin: String,

    /// Whether the request came from a cross-origin frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
}

impl AuthenticatorAssertion {
    /// Decode the client data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if the client data is not base64url
    /// encoded JSON.
    pub fn client_data(&self) -> crate::Result<ClientData> {
        let json = Base64UrlUnpadded::decode_vec(&self.response.client_data_json)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Everything an assertion verifier needs.
#[derive(Clone, Copy, Debug)]
pub struct AssertionInput<'a> {
    /// The credential public key as a COSE key.
    pub cose_key: &'a [u8],

    /// The assertion.
    pub assertion: &'a AuthenticatorAssertion,

    /// The challenge the assertion must sign.
    pub expected_challenge: &'a str,

    /// The origin the assertion must come from.
    pub expected_origin: &'a str,

    /// The relying party ID.
    pub expected_rp_id: &'a str,
}

/// Verifies WebAuthn assertions against a COSE public key.
pub trait AssertionVerifier: Send + Sync {
    /// Returns `true` if the assertion verifies.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or the verifier fails.
    fn verify(&self, input: &AssertionInput<'_>) -> impl Future<Output = crate::Result<bool>> + Send;
}

/// Bridge configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnOptions {
    /// Issuer of ID tokens.
    pub issuer: String,

    /// How long an issued challenge stays valid, in seconds.
    pub challenge_ttl_secs: i64,

    /// How long an ID token stays valid, in seconds.
    pub token_ttl_secs: i64,
}

impl Default for WebAuthnOptions {
    fn default() -> Self {
        Self {
            issuer: "did:web:localhost".to_string(),
            challenge_ttl_secs: 300,
            token_ttl_secs: 300,
        }
    }
}

/// Short-lived proof that the subject controls its `did:key`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IdToken {
    /// Issuer.
    pub iss: String,

    /// Subject: the user's DID.
    pub sub: String,

    /// Nonce bound to the challenge.
    pub nonce: String,

    /// Issued at, Unix seconds.
    pub iat: i64,

    /// Expires at, Unix seconds.
    pub exp: i64,
}

impl IdToken {
    /// Returns `true` once the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Returns `true` if the token has expired at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Issues challenges and verifies assertions against `did:key` identifiers.
#[derive(Debug)]
pub struct WebAuthnBridge<A: AssertionVerifier> {
    verifier: A,
    challenges: ChallengeStore,
    options: WebAuthnOptions,
}

impl<A: AssertionVerifier> WebAuthnBridge<A> {
    /// Create a bridge using `verifier`.
    #[must_use]
    pub fn new(verifier: A, options: WebAuthnOptions) -> Self {
        Self {
            verifier,
            challenges: ChallengeStore::new(options.challenge_ttl_secs),
            options,
        }
    }

    /// Issue a challenge.
    pub fn generate_challenge(&self) -> Challenge {
        self.generate_challenge_at(Utc::now().timestamp())
    }

    /// Issue a challenge at the supplied Unix time.
    pub fn generate_challenge_at(&self, now: i64) -> Challenge {
        self.challenges.issue(now)
    }

    /// Outstanding challenges.
    pub const fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    /// Verify that `user_did`'s key signed the assertion.
    ///
    /// # Errors
    ///
    /// See [`WebAuthnBridge::verify_assertion_at`].
    pub async fn verify_assertion(
        &self, assertion: &AuthenticatorAssertion, user_did: &str, nonce: &str, rp_id: &str,
        origin: &str,
    ) -> crate::Result<IdToken> {
        let now = Utc::now().timestamp();
        self.verify_assertion_at(assertion, user_did, nonce, rp_id, origin, now).await
    }

    /// Verify an assertion at the supplied Unix time. The challenge is
    /// consumed only when every check passes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOrExpiredChallenge`] if the challenge in the client
    ///   data was not issued, has expired, or was already used.
    /// - [`Error::NonceMismatch`] if `nonce` is not the one issued with the
    ///   challenge.
    /// - [`Error::AssertionFailed`] if the assertion does not verify.
    /// - Format or key errors for a malformed assertion or DID.
    pub async fn verify_assertion_at(
        &self, assertion: &AuthenticatorAssertion, user_did: &str, nonce: &str, rp_id: &str,
        origin: &str, now: i64,
    ) -> crate::Result<IdToken> {
        let token = self.check_assertion_at(assertion, user_did, nonce, rp_id, origin, now).await?;
        self.consume_challenge(assertion, now)?;
        Ok(token)
    }

    /// Verify an assertion without consuming its challenge, for callers that
    /// act on the token before committing to it. Call
    /// [`WebAuthnBridge::consume_challenge`] once the token has been used.
    ///
    /// # Errors
    ///
    /// See [`WebAuthnBridge::verify_assertion_at`].
    #[instrument(level = "debug", skip(self, assertion, nonce))]
    pub async fn check_assertion_at(
        &self, assertion: &AuthenticatorAssertion, user_did: &str, nonce: &str, rp_id: &str,
        origin: &str, now: i64,
    ) -> crate::Result<IdToken> {
        let challenge = assertion.client_data()?.challenge;

        let Some(issued_nonce) = self.challenges.lookup(&challenge, now) else {
            tracerr!(Error::InvalidOrExpiredChallenge);
        };
        if issued_nonce != nonce {
            tracerr!(Error::NonceMismatch);
        }

        let (key_type, public_key) = parse_did_key(user_did)?;
        let cose_key = cose::encode(key_type, &public_key)?;

        let input = AssertionInput {
            cose_key: &cose_key,
            assertion,
            expected_challenge: &challenge,
            expected_origin: origin,
            expected_rp_id: rp_id,
        };
        if !self.verifier.verify(&input).await? {
            tracerr!(Error::AssertionFailed(format!("assertion for {user_did} did not verify")));
        }
        info!(user_did, "assertion verified");

        Ok(IdToken {
            iss: self.options.issuer.clone(),
            sub: user_did.to_string(),
            nonce: issued_nonce,
            iat: now,
            exp: now.saturating_add(self.options.token_ttl_secs),
        })
    }

    /// Consume the challenge an assertion was made over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrExpiredChallenge`] if the challenge is no
    /// longer live.
    pub fn consume_challenge(
        &self, assertion: &AuthenticatorAssertion, now: i64,
    ) -> crate::Result<()> {
        let challenge = assertion.client_data()?.challenge;
        if !self.challenges.consume(&challenge, now) {
            tracerr!(Error::InvalidOrExpiredChallenge);
        }
        Ok(())
    }
}
