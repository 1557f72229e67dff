// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! ECDSA over secp256k1 (`ES256K`).

use k256::ecdsa::signature::Signer as _;
use k256::ecdsa::signature::Verifier as _;
use k256::ecdsa::Signature;
use k256::ecdsa::SigningKey;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::EncodedPoint;
use k256::FieldBytes;

use dweb_jose::jwu;
use dweb_jose::Jwk;
use dweb_jose::JwkType;

use crate::algorithm::CryptoAlg;
use crate::error::Error;
use crate::error::Result;
use crate::registry::SignatureAlgorithm;

const FIELD_LENGTH: usize = 32;

pub(crate) struct Secp256k1;

impl Secp256k1 {
  fn encode_private_jwk(signing_key: &SigningKey) -> Result<Jwk> {
    let point: EncodedPoint = signing_key.verifying_key().to_encoded_point(false);
    let x = point.x().ok_or_else(|| Error::InvalidKey("secp256k1 point has no x-coordinate".to_owned()))?;
    let y = point.y().ok_or_else(|| Error::InvalidKey("secp256k1 point has no y-coordinate".to_owned()))?;

    let mut jwk: Jwk = Jwk {
      kty: JwkType::Ec,
      crv: Some(CryptoAlg::Secp256k1.crv_name().to_owned()),
      alg: Some(CryptoAlg::Secp256k1.jws_name().to_owned()),
      kid: None,
      x: Some(jwu::encode_b64(x.as_slice())),
      y: Some(jwu::encode_b64(y.as_slice())),
      d: Some(jwu::encode_b64(signing_key.to_bytes().as_slice())),
      use_: None,
      key_ops: None,
    };
    jwk.kid = Some(jwk.thumbprint_sha256_b64()?);

    Ok(jwk)
  }

  fn decode_signing_key(jwk: &Jwk) -> Result<SigningKey> {
    let d: Vec<u8> = jwu::decode_b64(jwk.try_d()?)?;
    if d.len() != FIELD_LENGTH {
      return Err(Error::InvalidKey("secp256k1 secret scalar must be 32 bytes".to_owned()));
    }

    SigningKey::from_bytes(FieldBytes::from_slice(&d)).map_err(|err| Error::InvalidKey(err.to_string()))
  }

  fn decode_verifying_key(jwk: &Jwk) -> Result<VerifyingKey> {
    let x: Vec<u8> = jwu::decode_b64(jwk.try_x()?)?;
    let y: Vec<u8> = jwu::decode_b64(jwk.try_y()?)?;
    if x.len() != FIELD_LENGTH || y.len() != FIELD_LENGTH {
      return Err(Error::InvalidKey("secp256k1 coordinates must be 32 bytes".to_owned()));
    }

    let point: EncodedPoint = EncodedPoint::from_affine_coordinates(
      FieldBytes::from_slice(&x),
      FieldBytes::from_slice(&y),
      false,
    );

    VerifyingKey::from_encoded_point(&point).map_err(|err| Error::InvalidKey(err.to_string()))
  }
}

impl SignatureAlgorithm for Secp256k1 {
  fn alg(&self) -> CryptoAlg {
    CryptoAlg::Secp256k1
  }

  fn generate(&self) -> Result<Jwk> {
    let signing_key: SigningKey = SigningKey::random(&mut rand::rngs::OsRng);
    Self::encode_private_jwk(&signing_key)
  }

  fn public_jwk(&self, jwk: &Jwk) -> Result<Jwk> {
    if jwk.is_private() {
      let signing_key: SigningKey = Self::decode_signing_key(jwk)?;
      let mut public: Jwk = Self::encode_private_jwk(&signing_key)?.to_public();
      if let Some(kid) = &jwk.kid {
        public.kid = Some(kid.clone());
      }
      return Ok(public);
    }
    Self::decode_verifying_key(jwk)?;
    Ok(jwk.to_public())
  }

  fn sign(&self, jwk: &Jwk, data: &[u8]) -> Result<Vec<u8>> {
    let signing_key: SigningKey = Self::decode_signing_key(jwk)?;
    let signature: Signature = signing_key.sign(data);
    Ok(signature.to_bytes().to_vec())
  }

  fn verify(&self, jwk: &Jwk, signature: &[u8], data: &[u8]) -> bool {
    let Ok(verifying_key) = Self::decode_verifying_key(jwk) else {
      return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
      return false;
    };

    verifying_key.verify(data, &signature).is_ok()
  }
}
