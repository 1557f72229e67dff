// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The `did:jwk` method: the method-specific id *is* the public JWK,
//! base64url-encoded. Resolution is a pure decoding step.

use std::sync::Arc;

use async_trait::async_trait;

use dweb_crypto::KeyManager;
use dweb_crypto::KeyUri;
use dweb_jose::jwu;
use dweb_jose::Jwk;

use crate::bearer::BearerDid;
use crate::bearer::DidMetadata;
use crate::did::DidUri;
use crate::document::Document;
use crate::error::Result;
use crate::method::CreateOptions;
use crate::method::DidMethod;
use crate::methods::single_key_document;
use crate::resolution::ResolutionError;
use crate::resolution::ResolutionResult;

/// `did:jwk` back-end.
#[derive(Clone, Copy, Debug, Default)]
pub struct DidJwk;

impl DidJwk {
  /// The method name.
  pub const NAME: &'static str = "jwk";

  fn document_for(did: &DidUri, public_jwk: Jwk) -> Document {
    single_key_document(did, "0", public_jwk)
  }
}

#[async_trait]
impl DidMethod for DidJwk {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  async fn create(&self, key_manager: &Arc<dyn KeyManager>, options: CreateOptions) -> Result<BearerDid> {
    let key_uri: KeyUri = key_manager.generate_key(options.algorithm).await?;
    let public: Jwk = key_manager.get_public_key(&key_uri).await?;

    let id: String = jwu::encode_b64(serde_json::to_vec(&public).map_err(dweb_jose::Error::from)?);
    let uri: DidUri = DidUri::parse(&format!("did:jwk:{id}"))?;
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

    let Ok(jwk) = jwu::decode_b64(uri.id()).and_then(|bytes| Ok(serde_json::from_slice::<Jwk>(&bytes)?)) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };

    ResolutionResult::from_document(Self::document_for(&uri.to_did(), jwk.to_public()))
  }
}
