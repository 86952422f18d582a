//! Tests for proving control of a `did:key` with WebAuthn assertions, using
//! the in-process assertion verifier.

use base64ct::{Base64UrlUnpadded, Encoding};
use sha2::{Digest, Sha256};
use vercre_identity::auth::{LocalSigner, Signer};
use vercre_identity::webauthn::{
    AssertionResponse, AuthenticatorAssertion, ClientData, NativeAssertionVerifier,
    WebAuthnBridge, WebAuthnOptions,
};
use vercre_identity::{Error, KeyType};

const RP_ID: &str = "example.com";
const ORIGIN: &str = "https://example.com";

struct Authenticator<'a> {
    signer: &'a LocalSigner,
    rp_id: &'a str,
    origin: &'a str,
}

impl<'a> Authenticator<'a> {
    const fn new(signer: &'a LocalSigner) -> Self {
        Self {
            signer,
            rp_id: RP_ID,
            origin: ORIGIN,
        }
    }

    // Sign a challenge the way a platform authenticator does: over
    // `authenticatorData ∥ SHA-256(clientDataJSON)`, DER encoding P-256
    // signatures.
    async fn assert(&self, challenge: &str) -> AuthenticatorAssertion {
        let client_data = serde_json::to_vec(&ClientData {
            type_: "webauthn.get".into(),
            challenge: challenge.into(),
            origin: self.origin.into(),
            cross_origin: Some(false),
        })
        .expect("should serialize");

        let mut auth_data = Sha256::digest(self.rp_id.as_bytes()).to_vec();
        auth_data.push(0x01);
        auth_data.extend_from_slice(&7u32.to_be_bytes());

        let mut msg = auth_data.clone();
        msg.extend_from_slice(&Sha256::digest(&client_data));
        let mut signature = self.signer.try_sign(&msg).await.expect("should sign");
        if self.signer.key_type() == KeyType::EcdsaP256 {
            let sig = p256::ecdsa::Signature::from_slice(&signature).expect("should parse");
            signature = sig.to_der().as_bytes().to_vec();
        }

        AuthenticatorAssertion {
            id: "credential-1".into(),
            type_: "public-key".into(),
            response: AssertionResponse {
                client_data_json: Base64UrlUnpadded::encode_string(&client_data),
                authenticator_data: Base64UrlUnpadded::encode_string(&auth_data),
                signature: Base64UrlUnpadded::encode_string(&signature),
                user_handle: None,
            },
        }
    }
}

fn bridge() -> WebAuthnBridge<NativeAssertionVerifier> {
    WebAuthnBridge::new(NativeAssertionVerifier, WebAuthnOptions::default())
}

// P-256 and Ed25519 assertions verify, and each challenge is good for one
// token only.
#[tokio::test]
async fn assertion_issues_token() {
    for key_type in [KeyType::EcdsaP256, KeyType::Ed25519] {
        let bridge = bridge();
        let signer = LocalSigner::generate(key_type).expect("should generate");
        let challenge = bridge.generate_challenge();
        let assertion = Authenticator::new(&signer).assert(&challenge.challenge).await;

        let token = bridge
            .verify_assertion(&assertion, signer.did(), &challenge.nonce, RP_ID, ORIGIN)
            .await
            .expect("should verify");
        assert_eq!(token.iss, "did:web:localhost");
        assert_eq!(token.sub, signer.did());
        assert_eq!(token.nonce, challenge.nonce);
        assert!(!token.is_expired());

        let err = bridge
            .verify_assertion(&assertion, signer.did(), &challenge.nonce, RP_ID, ORIGIN)
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidOrExpiredChallenge), "{key_type}");
    }
}

// A challenge the bridge never issued is rejected before the signature is
// checked.
#[tokio::test]
async fn unissued_challenge() {
    let bridge = bridge();
    let signer = LocalSigner::generate(KeyType::EcdsaP256).expect("should generate");
    let assertion = Authenticator::new(&signer).assert("not-issued").await;

    let err = bridge
        .verify_assertion(&assertion, signer.did(), "nonce", RP_ID, ORIGIN)
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::InvalidOrExpiredChallenge));
}

// Assertions for another relying party, from another origin or by another key
// fail without consuming the challenge.
#[tokio::test]
async fn mismatched_assertions() {
    let bridge = bridge();
    let signer = LocalSigner::generate(KeyType::EcdsaP256).expect("should generate");
    let other = LocalSigner::generate(KeyType::EcdsaP256).expect("should generate");
    let challenge = bridge.generate_challenge();

    let wrong_rp = Authenticator {
        rp_id: "evil.example",
        ..Authenticator::new(&signer)
    };
    let wrong_origin = Authenticator {
        origin: "https://evil.example",
        ..Authenticator::new(&signer)
    };
    for authenticator in [wrong_rp, wrong_origin, Authenticator::new(&other)] {
        let assertion = authenticator.assert(&challenge.challenge).await;
        let err = bridge
            .verify_assertion(&assertion, signer.did(), &challenge.nonce, RP_ID, ORIGIN)
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::AssertionFailed(_)));
    }
    assert_eq!(bridge.challenges().len(), 1);

    let assertion = Authenticator::new(&signer).assert(&challenge.challenge).await;
    bridge
        .verify_assertion(&assertion, signer.did(), &challenge.nonce, RP_ID, ORIGIN)
        .await
        .expect("should verify");
}

// secp256k1 keys have no WebAuthn credential form.
#[tokio::test]
async fn secp256k1_unsupported() {
    let bridge = bridge();
    let signer = LocalSigner::generate(KeyType::Secp256k1).expect("should generate");
    let challenge = bridge.generate_challenge();
    let assertion = Authenticator::new(&signer).assert(&challenge.challenge).await;

    let err = bridge
        .verify_assertion(&assertion, signer.did(), &challenge.nonce, RP_ID, ORIGIN)
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::UnsupportedKeyType(_)));
}
