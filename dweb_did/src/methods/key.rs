// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The `did:key` method: a multibase/multicodec-wrapped static public key.
//!
//! Only Ed25519 keys (multicodec `0xed`) are supported; the other curves
//! shipped by the agent are served by `did:jwk`, which carries the full JWK
//! in the identifier.

use std::sync::Arc;

use async_trait::async_trait;
use multibase::Base;

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

// Unsigned-varint encoding of the ed25519-pub multicodec (0xed).
const ED25519_PUB_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// `did:key` back-end.
#[derive(Clone, Copy, Debug, Default)]
pub struct DidKey;

impl DidKey {
  /// The method name.
  pub const NAME: &'static str = "key";

  fn document_for(uri: &DidUri, public: Jwk) -> Document {
    // The verification method fragment equals the multibase identifier.
    single_key_document(uri, uri.id(), public)
  }
}

#[async_trait]
impl DidMethod for DidKey {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  async fn create(&self, key_manager: &Arc<dyn KeyManager>, options: CreateOptions) -> Result<BearerDid> {
    if options.algorithm != CryptoAlg::Ed25519 {
      return Err(Error::InvalidDocument("did:key supports Ed25519 keys only"));
    }

    let key_uri: KeyUri = key_manager.generate_key(CryptoAlg::Ed25519).await?;
    let public: Jwk = key_manager.get_public_key(&key_uri).await?;

    let raw: Vec<u8> = jwu::decode_b64(public.try_x()?)?;
    let mut prefixed: Vec<u8> = ED25519_PUB_MULTICODEC.to_vec();
    prefixed.extend_from_slice(&raw);
    let id: String = multibase::encode(Base::Base58Btc, prefixed);

    let uri: DidUri = DidUri::parse(&format!("did:key:{id}"))?;
    let document: Document = Self::document_for(&uri, public);

    Ok(BearerDid::new(uri, document, DidMetadata::default(), Arc::clone(key_manager)))
  }

  async fn resolve(&self, did: &str) -> ResolutionResult {
    let Ok(uri) = DidUri::parse(did) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };
    if uri.method() != Self::NAME {
      return ResolutionResult::from_error(ResolutionError::MethodNotSupported);
    }

    let Ok((_base, decoded)) = multibase::decode(uri.id()) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };
    let Some(raw) = decoded.strip_prefix(&ED25519_PUB_MULTICODEC[..]) else {
      // Valid multibase, but a key type this back-end does not serve.
      return ResolutionResult::from_error(ResolutionError::RepresentationNotSupported);
    };
    if raw.len() != 32 {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    }

    let mut public: Jwk = Jwk {
      kty: JwkType::Okp,
      crv: Some("Ed25519".to_owned()),
      alg: Some("EdDSA".to_owned()),
      kid: None,
      x: Some(jwu::encode_b64(raw)),
      y: None,
      d: None,
      use_: None,
      key_ops: None,
    };
    public.kid = public.thumbprint_sha256_b64().ok();

    ResolutionResult::from_document(Self::document_for(&uri.to_did(), public))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // did:key test vector for the RFC 8037 appendix A Ed25519 key.
  const X_B64: &str = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";

  fn did_for_fixture() -> String {
    let raw: Vec<u8> = jwu::decode_b64(X_B64).unwrap();
    let mut prefixed: Vec<u8> = ED25519_PUB_MULTICODEC.to_vec();
    prefixed.extend_from_slice(&raw);
    format!("did:key:{}", multibase::encode(Base::Base58Btc, prefixed))
  }

  #[tokio::test]
  async fn resolve_roundtrips_the_key() {
    let did: String = did_for_fixture();
    assert!(did.starts_with("did:key:z6Mk"), "{did}");

    let result: ResolutionResult = DidKey.resolve(&did).await;
    assert!(result.is_success());

    let document: Document = result.did_document.unwrap();
    let method = &document.verification_method[0];
    assert_eq!(method.public_key_jwk.as_ref().unwrap().x.as_deref(), Some(X_B64));
    assert_eq!(method.id, format!("{did}#{}", did.strip_prefix("did:key:").unwrap()));
  }

  #[tokio::test]
  async fn resolve_rejects_unknown_codecs() {
    // secp256k1-pub multicodec (0xe7) is not served by this back-end.
    let mut prefixed: Vec<u8> = vec![0xe7, 0x01];
    prefixed.extend_from_slice(&[0u8; 33]);
    let did: String = format!("did:key:{}", multibase::encode(Base::Base58Btc, prefixed));

    let result: ResolutionResult = DidKey.resolve(&did).await;
    assert_eq!(
      result.did_resolution_metadata.error,
      Some(ResolutionError::RepresentationNotSupported)
    );
  }
}
