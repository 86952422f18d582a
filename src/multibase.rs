//! # Multibase
//!
//! Self-describing byte to string encoding. The first character of an encoded
//! string names the base used for the remainder.
//!
//! See <https://github.com/multiformats/multibase>

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

/// The bases supported by this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Base {
    /// Bitcoin base58 alphabet, prefix `z`. Used for all key encodings.
    #[default]
    Base58Btc,

    /// RFC 4648 base64 with padding, prefix `M`.
    Base64Pad,

    /// Lowercase hexadecimal, prefix `f`.
    Base16Lower,

    /// RFC 4648 base64 without padding, prefix `m`.
    Base64,

    /// RFC 4648 URL-safe base64 without padding, prefix `u`.
    Base64Url,

    /// RFC 4648 URL-safe base64 with padding, prefix `U`.
    Base64UrlPad,
}

impl Base {
    /// Every supported base.
    pub const ALL: [Self; 6] = [
        Self::Base58Btc,
        Self::Base64Pad,
        Self::Base16Lower,
        Self::Base64,
        Self::Base64Url,
        Self::Base64UrlPad,
    ];

    /// The single character prefix identifying the base.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Base58Btc => 'z',
            Self::Base64Pad => 'M',
            Self::Base16Lower => 'f',
            Self::Base64 => 'm',
            Self::Base64Url => 'u',
            Self::Base64UrlPad => 'U',
        }
    }

    /// Look up a base by its prefix character.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBase`] when the character does not identify
    /// a supported base.
    pub fn from_code(code: char) -> crate::Result<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code).ok_or(Error::UnsupportedBase(code))
    }

    const fn inner(self) -> multibase::Base {
        match self {
            Self::Base58Btc => multibase::Base::Base58Btc,
            Self::Base64Pad => multibase::Base::Base64Pad,
            Self::Base16Lower => multibase::Base::Base16Lower,
            Self::Base64 => multibase::Base::Base64,
            Self::Base64Url => multibase::Base::Base64Url,
            Self::Base64UrlPad => multibase::Base::Base64UrlPad,
        }
    }
}

impl Display for Base {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base58Btc => "base58btc",
            Self::Base64Pad => "base64pad",
            Self::Base16Lower => "base16",
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
            Self::Base64UrlPad => "base64urlpad",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Base {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.to_string() == s)
            .ok_or_else(|| Error::InvalidFormat(format!("unknown multibase name: {s}")))
    }
}

/// Encode bytes with the given base, prefixed by the base's identifier.
#[must_use]
pub fn encode(bytes: impl AsRef<[u8]>, base: Base) -> String {
    multibase::encode(base.inner(), bytes)
}

/// Decode a multibase string, dispatching on its first character.
///
/// # Errors
///
/// Returns [`Error::UnsupportedBase`] for an unrecognised (or missing) prefix
/// and [`Error::InvalidFormat`] when the payload is not valid for the base.
pub fn decode(encoded: &str) -> crate::Result<Vec<u8>> {
    let Some(code) = encoded.chars().next() else {
        return Err(Error::UnsupportedBase('\0'));
    };
    Base::from_code(code)?;
    let (_, bytes) = multibase::decode(encoded)?;
    Ok(bytes)
}
