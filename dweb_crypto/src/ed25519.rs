// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! EdDSA over Ed25519.

use crypto::signatures::ed25519::PublicKey;
use crypto::signatures::ed25519::SecretKey;
use crypto::signatures::ed25519::Signature;
use dweb_jose::jwu;
use dweb_jose::Jwk;
use dweb_jose::JwkType;

use crate::algorithm::CryptoAlg;
use crate::error::Error;
use crate::error::Result;
use crate::registry::SignatureAlgorithm;

pub(crate) struct Ed25519;

impl Ed25519 {
  /// Encodes an Ed25519 key pair as a private JWK with `kid` set to the
  /// RFC 7638 thumbprint.
  pub(crate) fn encode_private_jwk(secret: &SecretKey) -> Result<Jwk> {
    let public: PublicKey = secret.public_key();
    let secret_bytes = secret.to_bytes();

    let mut jwk: Jwk = Jwk {
      kty: JwkType::Okp,
      crv: Some(CryptoAlg::Ed25519.crv_name().to_owned()),
      alg: Some(CryptoAlg::Ed25519.jws_name().to_owned()),
      kid: None,
      x: Some(jwu::encode_b64(public.to_bytes())),
      y: None,
      d: Some(jwu::encode_b64(&secret_bytes[..])),
      use_: None,
      key_ops: None,
    };
    jwk.kid = Some(jwk.thumbprint_sha256_b64()?);

    Ok(jwk)
  }

  fn decode_public(jwk: &Jwk) -> Result<PublicKey> {
    let x: Vec<u8> = jwu::decode_b64(jwk.try_x()?)?;
    let bytes: [u8; PublicKey::LENGTH] = x
      .try_into()
      .map_err(|_| Error::InvalidKey("Ed25519 public key must be 32 bytes".to_owned()))?;

    PublicKey::try_from(bytes).map_err(|err| Error::InvalidKey(err.to_string()))
  }

  fn decode_secret(jwk: &Jwk) -> Result<SecretKey> {
    let d: Vec<u8> = jwu::decode_b64(jwk.try_d()?)?;
    let bytes: [u8; SecretKey::LENGTH] = d
      .try_into()
      .map_err(|_| Error::InvalidKey("Ed25519 secret key must be 32 bytes".to_owned()))?;

    Ok(SecretKey::from_bytes(&bytes))
  }
}

impl SignatureAlgorithm for Ed25519 {
  fn alg(&self) -> CryptoAlg {
    CryptoAlg::Ed25519
  }

  fn generate(&self) -> Result<Jwk> {
    let secret: SecretKey = SecretKey::generate().map_err(|err| Error::SignatureFailure(err.to_string()))?;
    Self::encode_private_jwk(&secret)
  }

  fn public_jwk(&self, jwk: &Jwk) -> Result<Jwk> {
    // Re-derive the public coordinate from the scalar when present so the
    // result is consistent even for a JWK with a missing `x`.
    if jwk.is_private() {
      let secret: SecretKey = Self::decode_secret(jwk)?;
      let mut public: Jwk = Self::encode_private_jwk(&secret)?.to_public();
      if let Some(kid) = &jwk.kid {
        public.kid = Some(kid.clone());
      }
      return Ok(public);
    }
    // Validate before handing the key back.
    Self::decode_public(jwk)?;
    Ok(jwk.to_public())
  }

  fn sign(&self, jwk: &Jwk, data: &[u8]) -> Result<Vec<u8>> {
    let secret: SecretKey = Self::decode_secret(jwk)?;
    Ok(secret.sign(data).to_bytes().to_vec())
  }

  fn verify(&self, jwk: &Jwk, signature: &[u8], data: &[u8]) -> bool {
    let Ok(public) = Self::decode_public(jwk) else {
      return false;
    };
    let Ok(bytes) = <[u8; Signature::LENGTH]>::try_from(signature) else {
      return false;
    };

    public.verify(&Signature::from_bytes(bytes), data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // https://tools.ietf.org/html/rfc8037#appendix-A.4
  const PRIVATE_JWK: &str = r#"{
    "kty": "OKP",
    "crv": "Ed25519",
    "alg": "EdDSA",
    "d": "nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A",
    "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"
  }"#;
  const SIGNING_INPUT: &[u8] = b"eyJhbGciOiJFZERTQSJ9.RXhhbXBsZSBvZiBFZDI1NTE5IHNpZ25pbmc";
  const SIGNATURE_B64: &str =
    "hgyY0il_MGCjP0JzlnLWG1PPOt7-09PGcvMg3AIbQR6dWbhijcNR4ki4iylGjg5BhVsPt9g7sVvpAr_MuM0KAg";

  #[test]
  fn rfc8037_signature() {
    let jwk: Jwk = serde_json::from_str(PRIVATE_JWK).unwrap();
    let signature: Vec<u8> = Ed25519.sign(&jwk, SIGNING_INPUT).unwrap();

    assert_eq!(jwu::encode_b64(&signature), SIGNATURE_B64);
    assert!(Ed25519.verify(&jwk.to_public(), &signature, SIGNING_INPUT));
  }

  #[test]
  fn verify_rejects_tampered_data() {
    let jwk: Jwk = serde_json::from_str(PRIVATE_JWK).unwrap();
    let signature: Vec<u8> = Ed25519.sign(&jwk, SIGNING_INPUT).unwrap();

    assert!(!Ed25519.verify(&jwk.to_public(), &signature, b"tampered"));
    assert!(!Ed25519.verify(&jwk.to_public(), &signature[1..], SIGNING_INPUT));
  }

  #[test]
  fn public_jwk_rederives_coordinate() {
    let jwk: Jwk = serde_json::from_str(PRIVATE_JWK).unwrap();
    let public: Jwk = Ed25519.public_jwk(&jwk).unwrap();

    assert!(!public.is_private());
    assert_eq!(public.x, jwk.x);
  }
}
