// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! DID URL dereferencing.

use crate::did::DidUri;
use crate::document::Document;
use crate::document::Service;
use crate::document::VerificationMethod;
use crate::error::Error;
use crate::error::Result;
use crate::resolver::Resolver;

/// A resource addressed by a DID URL: the whole document when the URL has
/// no fragment, otherwise the matching verification method or service.
#[derive(Clone, Debug)]
pub enum Resource {
  /// The full DID document.
  Document(Document),
  /// A single verification method.
  VerificationMethod(VerificationMethod),
  /// A single service entry.
  Service(Service),
}

/// Dereferences `did_url`: resolves the DID and selects the fragment's
/// resource.
///
/// Fails with [`Error::InvalidDidUrl`] on unparseable input and
/// [`Error::NotFound`] when the DID does not resolve or the fragment does
/// not exist in the document.
pub async fn dereference(resolver: &Resolver, did_url: &str) -> Result<Resource> {
  let uri: DidUri = DidUri::parse(did_url).map_err(|_| Error::InvalidDidUrl(did_url.to_owned()))?;

  let resolution = resolver.resolve(&uri.to_did().to_string()).await;
  let document: Document = resolution.did_document.ok_or_else(|| Error::NotFound(did_url.to_owned()))?;

  let Some(fragment) = uri.fragment() else {
    return Ok(Resource::Document(document));
  };

  let reference: String = format!("#{fragment}");
  if let Some(method) = document.resolve_method(&reference) {
    return Ok(Resource::VerificationMethod(method.clone()));
  }
  if let Some(service) = document.resolve_service(&reference) {
    return Ok(Resource::Service(service.clone()));
  }

  Err(Error::NotFound(did_url.to_owned()))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::methods::DidJwk;
  use dweb_jose::jwu;
  use dweb_jose::Jwk;

  fn jwk_did() -> String {
    let jwk: Jwk = serde_json::from_str(
      r#"{"kty": "OKP", "crv": "Ed25519", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#,
    )
    .unwrap();
    format!("did:jwk:{}", jwu::encode_b64(serde_json::to_vec(&jwk).unwrap()))
  }

  fn resolver() -> Resolver {
    let mut resolver: Resolver = Resolver::new();
    resolver.register(Arc::new(DidJwk));
    resolver
  }

  #[tokio::test]
  async fn whole_document_without_fragment() {
    let resolver: Resolver = resolver();
    let resource: Resource = dereference(&resolver, &jwk_did()).await.unwrap();
    assert!(matches!(resource, Resource::Document(_)));
  }

  #[tokio::test]
  async fn fragment_selects_verification_method() {
    let resolver: Resolver = resolver();
    let did_url: String = format!("{}#0", jwk_did());

    let resource: Resource = dereference(&resolver, &did_url).await.unwrap();
    let Resource::VerificationMethod(method) = resource else {
      panic!("expected a verification method");
    };
    assert!(method.id.ends_with("#0"));
  }

  #[tokio::test]
  async fn missing_fragment_is_not_found() {
    let resolver: Resolver = resolver();
    let did_url: String = format!("{}#missing", jwk_did());

    assert!(matches!(
      dereference(&resolver, &did_url).await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn unparseable_input_is_an_invalid_did_url() {
    let resolver: Resolver = resolver();
    assert!(matches!(
      dereference(&resolver, "::definitely not a did::").await,
      Err(Error::InvalidDidUrl(_))
    ));
  }
}
