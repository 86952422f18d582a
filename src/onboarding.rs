//! # Onboarding
//!
//! First-time bootstrap of a user's DID document. The user proves control of
//! their `did:key` with a WebAuthn assertion; the custodian then creates a
//! document for that DID with `authentication` and `capabilityDelegation` on
//! the user's key, so later changes can be authorized by the user alone.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::document::Document;
use crate::vdr::{CustodianRequest, Vdr};
use crate::webauthn::{AssertionVerifier, AuthenticatorAssertion, IdToken, WebAuthnBridge};

/// Request to onboard a user.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    /// The user's `did:key`.
    pub user_did: String,

    /// Assertion over a challenge issued by the custodian.
    pub assertion: AuthenticatorAssertion,

    /// Nonce issued with the challenge.
    pub nonce: String,
}

/// A successful onboarding.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Onboarded {
    /// Token proving the user controls the DID.
    pub token: IdToken,

    /// The created DID document.
    pub document: Document,
}

/// Creates DID documents on behalf of users who prove control of their key.
#[derive(Debug)]
pub struct Custodian<V: Vdr, A: AssertionVerifier> {
    vdr: V,
    bridge: WebAuthnBridge<A>,
}

impl<V: Vdr, A: AssertionVerifier> Custodian<V, A> {
    /// Create a custodian writing to `vdr`.
    #[must_use]
    pub const fn new(vdr: V, bridge: WebAuthnBridge<A>) -> Self {
        Self { vdr, bridge }
    }

    /// The bridge, used to issue challenges.
    pub const fn bridge(&self) -> &WebAuthnBridge<A> {
        &self.bridge
    }

    /// The registry documents are created in.
    pub const fn vdr(&self) -> &V {
        &self.vdr
    }

    /// Verify the user's assertion and create their document. The challenge
    /// is consumed only once the document has been created.
    ///
    /// # Errors
    ///
    /// Fails if the assertion does not verify (see
    /// [`WebAuthnBridge::verify_assertion`]) or the registry rejects the
    /// document.
    pub async fn onboard(
        &self, request: OnboardingRequest, rp_id: &str, origin: &str,
    ) -> crate::Result<Onboarded> {
        self.onboard_at(request, rp_id, origin, Utc::now().timestamp()).await
    }

    /// Onboard at the supplied Unix time.
    ///
    /// # Errors
    ///
    /// See [`Custodian::onboard`].
    #[instrument(level = "debug", skip_all, fields(user_did = %request.user_did))]
    pub async fn onboard_at(
        &self, request: OnboardingRequest, rp_id: &str, origin: &str, now: i64,
    ) -> crate::Result<Onboarded> {
        let token = self
            .bridge
            .check_assertion_at(
                &request.assertion,
                &request.user_did,
                &request.nonce,
                rp_id,
                origin,
                now,
            )
            .await?;

        // the challenge stays live if the registry rejects the document
        let document = self
            .vdr
            .create_via_custodian(CustodianRequest {
                user_did: request.user_did,
                services: vec![],
            })
            .await?;
        self.bridge.consume_challenge(&request.assertion, now)?;
        info!(did = %document.id, "onboarded");

        Ok(Onboarded { token, document })
    }
}
