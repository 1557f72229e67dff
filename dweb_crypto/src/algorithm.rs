// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Normalization of `(alg, crv)` pairs onto the registered algorithms.

use core::fmt::Display;
use core::fmt::Formatter;

use dweb_jose::Jwk;

use crate::error::Error;
use crate::error::Result;

/// The signature algorithms the registry dispatches over.
///
/// Aliases are resolved here: `ES256K` without a curve, or `secp256k1`
/// without an `alg`, both select [`CryptoAlg::Secp256k1`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum CryptoAlg {
  /// EdDSA over Ed25519.
  Ed25519,
  /// ECDSA over secp256k1 (`ES256K`).
  Secp256k1,
  /// ECDSA over secp256r1 / P-256 (`ES256`).
  Secp256r1,
}

impl CryptoAlg {
  /// The JWS `alg` value emitted for keys of this algorithm.
  pub const fn jws_name(&self) -> &'static str {
    match self {
      Self::Ed25519 => "EdDSA",
      Self::Secp256k1 => "ES256K",
      Self::Secp256r1 => "ES256",
    }
  }

  /// The JWK `crv` value emitted for keys of this algorithm.
  pub const fn crv_name(&self) -> &'static str {
    match self {
      Self::Ed25519 => "Ed25519",
      Self::Secp256k1 => "secp256k1",
      Self::Secp256r1 => "P-256",
    }
  }

  /// Selects the algorithm for an explicit `(alg, crv)` pair, applying the
  /// registry's aliases. Either member may be absent; an unmatched or
  /// contradictory pair fails with [`Error::AlgorithmNotSupported`].
  pub fn from_alg_crv(alg: Option<&str>, crv: Option<&str>) -> Result<Self> {
    match (alg, crv) {
      (Some("EdDSA"), Some("Ed25519")) | (Some("EdDSA"), None) | (None, Some("Ed25519")) => Ok(Self::Ed25519),
      (Some("ES256K"), Some("secp256k1")) | (Some("ES256K"), None) | (None, Some("secp256k1")) => Ok(Self::Secp256k1),
      (Some("ES256"), Some("P-256" | "secp256r1")) | (Some("ES256"), None) | (None, Some("P-256" | "secp256r1")) => {
        Ok(Self::Secp256r1)
      }
      (alg, crv) => Err(Error::AlgorithmNotSupported {
        alg: alg.unwrap_or("-").to_owned(),
        crv: crv.unwrap_or("-").to_owned(),
      }),
    }
  }

  /// Selects the algorithm for a JWK from its `alg`/`crv` members.
  pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
    Self::from_alg_crv(jwk.alg.as_deref(), jwk.crv.as_deref())
  }

  /// Parses an algorithm identifier as used in key generation requests.
  pub fn from_name(name: &str) -> Result<Self> {
    match name {
      "Ed25519" | "EdDSA" => Ok(Self::Ed25519),
      "secp256k1" | "ES256K" => Ok(Self::Secp256k1),
      "secp256r1" | "P-256" | "ES256" => Ok(Self::Secp256r1),
      other => Err(Error::AlgorithmNotSupported {
        alg: other.to_owned(),
        crv: "-".to_owned(),
      }),
    }
  }
}

impl Display for CryptoAlg {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str(self.crv_name())
  }
}
