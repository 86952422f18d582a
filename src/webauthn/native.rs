//! In-process WebAuthn assertion verification.

use base64ct::{Base64UrlUnpadded, Encoding};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use super::{AssertionInput, AssertionVerifier};
use crate::crypto::{CryptoProvider, Provider};
use crate::error::Error;
use crate::webauthn::cose;

/// Authenticator data flag: user present.
const FLAG_UP: u8 = 0x01;

/// rpIdHash (32) + flags (1) + signCount (4)
const MIN_AUTH_DATA_LEN: usize = 37;

/// Verifies assertions in process.
///
/// Checks the client data (`type`, `challenge`, `origin`), the authenticator
/// data (`rpIdHash` and the user-present flag) and the signature over
/// `authenticatorData ∥ SHA-256(clientDataJSON)`. P-256 signatures are DER
/// encoded, Ed25519 signatures are raw.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeAssertionVerifier;

impl NativeAssertionVerifier {
    fn check(input: &AssertionInput<'_>) -> crate::Result<bool> {
        let response = &input.assertion.response;

        let client_data = input.assertion.client_data()?;
        if client_data.type_ != "webauthn.get" {
            debug!(type_ = %client_data.type_, "not an assertion");
            return Ok(false);
        }
        if client_data.challenge != input.expected_challenge {
            debug!("challenge mismatch");
            return Ok(false);
        }

        let expected = Url::parse(input.expected_origin)
            .map_err(|e| Error::InvalidFormat(format!("expected origin: {e}")))?;
        let Ok(origin) = Url::parse(&client_data.origin) else {
            debug!(origin = %client_data.origin, "unparseable origin");
            return Ok(false);
        };
        if origin.origin() != expected.origin() {
            debug!(origin = %client_data.origin, "origin mismatch");
            return Ok(false);
        }

        let auth_data = Base64UrlUnpadded::decode_vec(&response.authenticator_data)?;
        if auth_data.len() < MIN_AUTH_DATA_LEN {
            return Err(Error::InvalidFormat(format!(
                "authenticator data is {} bytes, expected at least {MIN_AUTH_DATA_LEN}",
                auth_data.len()
            )));
        }
        if auth_data[..32] != Sha256::digest(input.expected_rp_id.as_bytes())[..] {
            debug!(rp_id = input.expected_rp_id, "rpIdHash mismatch");
            return Ok(false);
        }
        if auth_data[32] & FLAG_UP == 0 {
            debug!("user not present");
            return Ok(false);
        }

        let key = cose::decode(input.cose_key)?;
        let client_data_json = Base64UrlUnpadded::decode_vec(&response.client_data_json)?;
        let signature = Base64UrlUnpadded::decode_vec(&response.signature)?;

        let mut msg = auth_data;
        msg.extend_from_slice(&Sha256::digest(&client_data_json));

        Ok(Provider::for_key_type(key.key_type).verify(&msg, &signature, &key.bytes))
    }
}

impl AssertionVerifier for NativeAssertionVerifier {
    async fn verify(&self, input: &AssertionInput<'_>) -> crate::Result<bool> {
        Self::check(input)
    }
}
