// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The static algorithm registry.
//!
//! One instance per algorithm, constructed lazily and shared process-wide.
//! Aliases (`ES256K`/`secp256k1`, `ES256`/`secp256r1`) are normalized by
//! [`CryptoAlg`] before dispatch.

use crypto::hashes::sha::Sha256;
use crypto::hashes::Digest;
use once_cell::sync::Lazy;

use dweb_jose::Jwk;

use crate::algorithm::CryptoAlg;
use crate::ed25519::Ed25519;
use crate::error::Error;
use crate::error::Result;
use crate::secp256k1::Secp256k1;
use crate::secp256r1::Secp256r1;

/// The operations every registered signature algorithm provides.
pub(crate) trait SignatureAlgorithm: Send + Sync {
  fn alg(&self) -> CryptoAlg;
  fn generate(&self) -> Result<Jwk>;
  fn public_jwk(&self, jwk: &Jwk) -> Result<Jwk>;
  fn sign(&self, jwk: &Jwk, data: &[u8]) -> Result<Vec<u8>>;
  fn verify(&self, jwk: &Jwk, signature: &[u8], data: &[u8]) -> bool;
}

static ALGORITHMS: Lazy<[&'static (dyn SignatureAlgorithm); 3]> =
  Lazy::new(|| [&Ed25519, &Secp256k1, &Secp256r1]);

fn instance(alg: CryptoAlg) -> &'static dyn SignatureAlgorithm {
  ALGORITHMS
    .iter()
    .copied()
    .find(|entry| entry.alg() == alg)
    .expect("every CryptoAlg variant is registered")
}

/// Signs `data` with the given private JWK, selecting the algorithm from the
/// key's `alg`/`crv` members.
pub fn sign(key: &Jwk, data: &[u8]) -> Result<Vec<u8>> {
  instance(CryptoAlg::from_jwk(key)?).sign(key, data)
}

/// Verifies `signature` over `data` with the given public JWK.
///
/// Returns `Ok(false)` on an integrity failure; bad signatures are never an
/// error. Fails only when the key selects no registered algorithm.
pub fn verify(key: &Jwk, signature: &[u8], data: &[u8]) -> Result<bool> {
  Ok(instance(CryptoAlg::from_jwk(key)?).verify(key, signature, data))
}

/// Generates a fresh private JWK for `algorithm` with `alg`, `crv` and
/// `kid` (the RFC 7638 thumbprint) populated.
pub fn generate_key(algorithm: CryptoAlg) -> Result<Jwk> {
  instance(algorithm).generate()
}

/// Derives the public JWK corresponding to `key`, stripping private members.
pub fn public_key(key: &Jwk) -> Result<Jwk> {
  instance(CryptoAlg::from_jwk(key)?).public_jwk(key)
}

/// Computes a digest with the named algorithm. Only `SHA-256` is registered.
pub fn digest(algorithm: &str, data: &[u8]) -> Result<Vec<u8>> {
  match algorithm {
    "SHA-256" => {
      let mut hasher: Sha256 = Sha256::new();
      hasher.update(data);
      Ok(hasher.finalize().to_vec())
    }
    other => Err(Error::AlgorithmNotSupported {
      alg: other.to_owned(),
      crv: "-".to_owned(),
    }),
  }
}

/// Computes the RFC 7638 thumbprint of `key` over its canonical public
/// members only.
pub fn compute_thumbprint(key: &Jwk) -> Result<String> {
  Ok(key.thumbprint_sha256_b64()?)
}
