// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use core::fmt::Display;
use core::fmt::Formatter;
use core::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use dweb_jose::Jwk;

use crate::error::Error;
use crate::error::Result;

/// The URI scheme prefix of content-addressed key identifiers.
pub const KEY_URI_PREFIX: &str = "urn:jwk:";

/// A content-addressed key identifier: `urn:jwk:<RFC 7638 thumbprint>`.
///
/// Derived solely from a JWK's canonical public members, so the URI of a
/// private key always equals the URI of its public counterpart, and byte
/// equality of two URIs implies key-material equality.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct KeyUri(String);

impl KeyUri {
  /// Computes the key URI of the given JWK.
  pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
    Ok(Self(format!("{KEY_URI_PREFIX}{}", jwk.thumbprint_sha256_b64()?)))
  }

  /// Returns the thumbprint portion of the URI.
  pub fn thumbprint(&self) -> &str {
    &self.0[KEY_URI_PREFIX.len()..]
  }

  /// Returns the URI as a string slice.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl FromStr for KeyUri {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if !s.starts_with(KEY_URI_PREFIX) || s.len() == KEY_URI_PREFIX.len() {
      return Err(Error::InvalidKey(format!("`{s}` is not a `{KEY_URI_PREFIX}` URI")));
    }
    Ok(Self(s.to_owned()))
  }
}

impl Display for KeyUri {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for KeyUri {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::algorithm::CryptoAlg;
  use crate::registry;

  #[test]
  fn private_and_public_uris_are_equal() {
    let private: Jwk = registry::generate_key(CryptoAlg::Ed25519).unwrap();
    let public: Jwk = registry::public_key(&private).unwrap();

    assert_eq!(KeyUri::from_jwk(&private).unwrap(), KeyUri::from_jwk(&public).unwrap());
  }

  #[test]
  fn parse_rejects_foreign_schemes() {
    assert!(KeyUri::from_str("urn:jwk:abc123").is_ok());
    assert!(KeyUri::from_str("urn:uuid:abc123").is_err());
    assert!(KeyUri::from_str("urn:jwk:").is_err());
  }
}
