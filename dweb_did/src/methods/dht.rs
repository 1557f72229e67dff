// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The `did:dht` method.
//!
//! The method-specific id is the z-base-32 encoding of the DID's Ed25519
//! identity key, so documents for unpublished DIDs are derivable locally.
//! Publication and retrieval of extended documents through a DHT gateway is
//! a transport concern outside this crate; the back-end only implements the
//! local derivation.

use std::sync::Arc;

use async_trait::async_trait;

use dweb_crypto::CryptoAlg;
use dweb_crypto::KeyManager;
use dweb_crypto::KeyUri;
use dweb_jose::jwu;
use dweb_jose::Jwk;
use dweb_jose::JwkType;

use crate::bearer::BearerDid;
use crate::bearer::DidMetadata;
use crate::did::DidUri;
use crate::document::Document;
use crate::error::Error;
use crate::error::Result;
use crate::method::CreateOptions;
use crate::method::DidMethod;
use crate::methods::single_key_document;
use crate::resolution::ResolutionError;
use crate::resolution::ResolutionResult;

/// `did:dht` back-end.
#[derive(Clone, Copy, Debug, Default)]
pub struct DidDht;

impl DidDht {
  /// The method name.
  pub const NAME: &'static str = "dht";

  /// The fragment of the identity key's verification method.
  const IDENTITY_KEY_FRAGMENT: &'static str = "0";

  /// Derives the `did:dht` URI for an Ed25519 public JWK.
  pub fn did_from_identity_key(public: &Jwk) -> Result<DidUri> {
    if public.kty != JwkType::Okp || public.crv.as_deref() != Some("Ed25519") {
      return Err(Error::InvalidDocument("did:dht identity keys are Ed25519"));
    }
    let raw: Vec<u8> = jwu::decode_b64(public.try_x()?)?;
    DidUri::parse(&format!("did:dht:{}", zbase32::encode(&raw)))
  }

  fn document_for(uri: &DidUri, public: Jwk) -> Document {
    single_key_document(uri, Self::IDENTITY_KEY_FRAGMENT, public)
  }
}

#[async_trait]
impl DidMethod for DidDht {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  async fn create(&self, key_manager: &Arc<dyn KeyManager>, options: CreateOptions) -> Result<BearerDid> {
    if options.algorithm != CryptoAlg::Ed25519 {
      return Err(Error::InvalidDocument("did:dht identity keys are Ed25519"));
    }

    let key_uri: KeyUri = key_manager.generate_key(CryptoAlg::Ed25519).await?;
    let public: Jwk = key_manager.get_public_key(&key_uri).await?;

    let uri: DidUri = Self::did_from_identity_key(&public)?;
    let document: Document = Self::document_for(&uri, public);

    Ok(BearerDid::new(uri, document, DidMetadata { published: Some(false) }, Arc::clone(key_manager)))
  }

  async fn resolve(&self, did: &str) -> ResolutionResult {
    let Ok(uri) = DidUri::parse(did) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };
    if uri.method() != Self::NAME {
      return ResolutionResult::from_error(ResolutionError::MethodNotSupported);
    }

    let Some(raw) = zbase32::decode(uri.id()) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };
    if raw.len() != 32 {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    }

    let mut public: Jwk = Jwk {
      kty: JwkType::Okp,
      crv: Some("Ed25519".to_owned()),
      alg: Some("EdDSA".to_owned()),
      kid: None,
      x: Some(jwu::encode_b64(&raw)),
      y: None,
      d: None,
      use_: None,
      key_ops: None,
    };
    public.kid = public.thumbprint_sha256_b64().ok();

    ResolutionResult::from_document(Self::document_for(&uri.to_did(), public))
  }
}

/// z-base-32 as used by `did:dht` identifiers.
mod zbase32 {
  const ALPHABET: &[u8; 32] = b"ybndrfg8ejkmcpqxot1uwisza345h769";

  pub(super) fn encode(data: &[u8]) -> String {
    let mut output: String = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u16 = 0;
    let mut bits: u32 = 0;

    for byte in data {
      buffer = (buffer << 8) | u16::from(*byte);
      bits += 8;
      while bits >= 5 {
        bits -= 5;
        output.push(ALPHABET[usize::from((buffer >> bits) & 0x1f)] as char);
      }
    }
    if bits > 0 {
      output.push(ALPHABET[usize::from((buffer << (5 - bits)) & 0x1f)] as char);
    }

    output
  }

  pub(super) fn decode(input: &str) -> Option<Vec<u8>> {
    let mut output: Vec<u8> = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u16 = 0;
    let mut bits: u32 = 0;

    for symbol in input.bytes() {
      let value: u16 = ALPHABET.iter().position(|c| *c == symbol)? as u16;
      buffer = (buffer << 5) | value;
      bits += 5;
      if bits >= 8 {
        bits -= 8;
        output.push((buffer >> bits) as u8);
      }
    }

    Some(output)
  }

  #[cfg(test)]
  mod tests {
    use super::*;

    #[test]
    fn known_single_byte() {
      assert_eq!(encode(&[0xff]), "9h");
      assert_eq!(decode("9h").unwrap(), vec![0xff]);
    }

    #[test]
    fn roundtrip_32_bytes() {
      let data: Vec<u8> = (0u8..32).collect();
      let encoded: String = encode(&data);
      assert_eq!(encoded.len(), 52);
      assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn rejects_foreign_symbols() {
      assert!(decode("l0v2").is_none());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifier_is_zbase32_of_identity_key() {
    let public: Jwk = serde_json::from_str(
      r#"{"kty": "OKP", "crv": "Ed25519", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#,
    )
    .unwrap();

    let uri: DidUri = DidDht::did_from_identity_key(&public).unwrap();
    assert_eq!(uri.method(), "dht");
    assert_eq!(uri.id().len(), 52);

    // Same key, same identifier.
    assert_eq!(DidDht::did_from_identity_key(&public).unwrap(), uri);
  }

  #[test]
  fn non_ed25519_keys_are_rejected() {
    let public: Jwk = serde_json::from_str(
      r#"{"kty": "EC", "crv": "secp256k1", "x": "AA", "y": "AA"}"#,
    )
    .unwrap();
    assert!(DidDht::did_from_identity_key(&public).is_err());
  }

  #[tokio::test]
  async fn resolve_rebuilds_the_document() {
    let public: Jwk = serde_json::from_str(
      r#"{"kty": "OKP", "crv": "Ed25519", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#,
    )
    .unwrap();
    let uri: DidUri = DidDht::did_from_identity_key(&public).unwrap();

    let result: ResolutionResult = DidDht.resolve(&uri.to_string()).await;
    assert!(result.is_success());

    let document: Document = result.did_document.unwrap();
    let method = document.resolve_method("#0").unwrap();
    assert_eq!(
      method.public_key_jwk.as_ref().unwrap().x,
      public.x,
    );
  }

  #[tokio::test]
  async fn resolve_rejects_bad_identifiers() {
    let result: ResolutionResult = DidDht.resolve("did:dht:yyyy").await;
    assert_eq!(
      result.did_resolution_metadata.error,
      Some(ResolutionError::InvalidDid)
    );
  }
}
