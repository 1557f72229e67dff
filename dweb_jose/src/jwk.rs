// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! JSON Web Key representation and RFC 7638 thumbprint computation.

use core::fmt::Debug;
use core::fmt::Display;
use core::fmt::Formatter;

use crypto::hashes::sha::Sha256;
use crypto::hashes::Digest;
use serde::Deserialize;
use serde::Serialize;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

use crate::error::Error;
use crate::error::Result;
use crate::jwu;

/// Supported JWK key types (`kty`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum JwkType {
  /// Octet key pairs (Ed25519 and friends).
  #[serde(rename = "OKP")]
  Okp,
  /// Elliptic curve keys (secp256k1, P-256).
  #[serde(rename = "EC")]
  Ec,
  /// Symmetric octet sequences.
  #[serde(rename = "oct")]
  Oct,
}

impl Display for JwkType {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::Okp => f.write_str("OKP"),
      Self::Ec => f.write_str("EC"),
      Self::Oct => f.write_str("oct"),
    }
  }
}

/// A JSON Web Key as defined in [RFC 7517](https://www.rfc-editor.org/rfc/rfc7517).
///
/// The agent only ever constructs signing keys, so the member set is the
/// asymmetric one: `x`/`y` hold the public coordinates and `d` the private
/// scalar, all base64url-encoded. Private members are zeroized on drop.
#[derive(Clone, Deserialize, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct Jwk {
  /// Key type.
  #[zeroize(skip)]
  pub kty: JwkType,
  /// Curve name, present on all asymmetric keys.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub crv: Option<String>,
  /// Intended JWS algorithm.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub alg: Option<String>,
  /// Key id. Defaults to the RFC 7638 thumbprint when absent.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kid: Option<String>,
  /// Public key x-coordinate (or the raw public key for OKP).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub x: Option<String>,
  /// Public key y-coordinate, EC keys only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub y: Option<String>,
  /// Private key material.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub d: Option<String>,
  /// Public key use.
  #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
  pub use_: Option<String>,
  /// Permitted key operations.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub key_ops: Option<Vec<String>>,
}

impl Jwk {
  /// Returns `true` if this key carries private key material.
  pub fn is_private(&self) -> bool {
    self.d.is_some()
  }

  /// Returns a copy of this key with all private and usage members removed.
  pub fn to_public(&self) -> Jwk {
    Jwk {
      kty: self.kty,
      crv: self.crv.clone(),
      alg: self.alg.clone(),
      kid: self.kid.clone(),
      x: self.x.clone(),
      y: self.y.clone(),
      d: None,
      use_: None,
      key_ops: None,
    }
  }

  /// Returns the `crv` member or fails with [`Error::InvalidKey`].
  pub fn try_crv(&self) -> Result<&str> {
    self.crv.as_deref().ok_or(Error::InvalidKey("missing `crv` member"))
  }

  /// Returns the `x` member or fails with [`Error::InvalidKey`].
  pub fn try_x(&self) -> Result<&str> {
    self.x.as_deref().ok_or(Error::InvalidKey("missing `x` member"))
  }

  /// Returns the `y` member or fails with [`Error::InvalidKey`].
  pub fn try_y(&self) -> Result<&str> {
    self.y.as_deref().ok_or(Error::InvalidKey("missing `y` member"))
  }

  /// Returns the `d` member or fails with [`Error::InvalidKey`].
  pub fn try_d(&self) -> Result<&str> {
    self.d.as_deref().ok_or(Error::InvalidKey("missing `d` member"))
  }

  /// Computes the base64url-encoded SHA-256 thumbprint of this key as
  /// defined in [RFC 7638](https://www.rfc-editor.org/rfc/rfc7638).
  ///
  /// Only the required public members enter the canonical form, ordered
  /// lexicographically, so a private key and its public counterpart always
  /// produce the same thumbprint.
  pub fn thumbprint_sha256_b64(&self) -> Result<String> {
    let canonical: String = match self.kty {
      JwkType::Ec => format!(
        r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
        self.try_crv()?,
        self.try_x()?,
        self.try_y()?,
      ),
      JwkType::Okp => format!(
        r#"{{"crv":"{}","kty":"OKP","x":"{}"}}"#,
        self.try_crv()?,
        self.try_x()?,
      ),
      JwkType::Oct => return Err(Error::UnsupportedKeyType(self.kty.to_string())),
    };

    let mut hasher: Sha256 = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(jwu::encode_b64(hasher.finalize().as_slice()))
  }

  /// Returns the `kid` member, falling back to the RFC 7638 thumbprint.
  pub fn kid_or_thumbprint(&self) -> Result<String> {
    match self.kid.as_deref() {
      Some(kid) => Ok(kid.to_owned()),
      None => self.thumbprint_sha256_b64(),
    }
  }
}

impl PartialEq for Jwk {
  /// Two keys are equal when their public thumbprints are equal.
  fn eq(&self, other: &Self) -> bool {
    match (self.thumbprint_sha256_b64(), other.thumbprint_sha256_b64()) {
      (Ok(a), Ok(b)) => a == b,
      _ => false,
    }
  }
}

impl Eq for Jwk {}

// The private scalar must not leak through debug output.
impl Debug for Jwk {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Jwk")
      .field("kty", &self.kty)
      .field("crv", &self.crv)
      .field("alg", &self.alg)
      .field("kid", &self.kid)
      .field("x", &self.x)
      .field("y", &self.y)
      .field("d", &self.d.as_ref().map(|_| "<redacted>"))
      .finish()
  }
}
