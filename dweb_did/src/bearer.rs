// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! In-process (`BearerDid`) and serialized (`PortableDid`) DID handles.

use core::fmt::Debug;
use core::fmt::Formatter;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use dweb_crypto::CryptoAlg;
use dweb_crypto::KeyManager;
use dweb_crypto::KeyManagerSigner;
use dweb_crypto::KeyStorageErrorKind;
use dweb_crypto::KeyUri;
use dweb_jose::Jwk;

use crate::did::DidUri;
use crate::document::Document;
use crate::document::VerificationMethod;
use crate::document::VerificationRelationship;
use crate::error::Error;
use crate::error::Result;

/// Method-agnostic metadata attached to a DID handle.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DidMetadata {
  /// Whether the DID has been published to its method's registry.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub published: Option<bool>,
}

/// A DID bound to the key manager holding its private keys.
///
/// The binding is what makes signing possible; the private keys themselves
/// never leave the key manager.
#[derive(Clone)]
pub struct BearerDid {
  /// The DID URI.
  pub uri: DidUri,
  /// The resolved or locally constructed DID document.
  pub document: Document,
  /// Method metadata.
  pub metadata: DidMetadata,
  key_manager: Arc<dyn KeyManager>,
}

impl BearerDid {
  /// Binds `uri`/`document` to the key manager holding the DID's keys.
  pub fn new(uri: DidUri, document: Document, metadata: DidMetadata, key_manager: Arc<dyn KeyManager>) -> Self {
    Self {
      uri,
      document,
      metadata,
      key_manager,
    }
  }

  /// Returns the key manager this DID is bound to.
  pub fn key_manager(&self) -> &Arc<dyn KeyManager> {
    &self.key_manager
  }

  /// Constructs a signer for this DID.
  ///
  /// With an explicit `key_uri` the referenced public key must appear in
  /// the DID document (matched by RFC 7638 thumbprint); otherwise the
  /// document's default signing method is selected and its key fetched
  /// from the key manager.
  pub async fn get_signer(&self, key_uri: Option<&KeyUri>) -> Result<KeyManagerSigner> {
    let (public, method_id): (Jwk, String) = match key_uri {
      Some(key_uri) => {
        let public: Jwk = self.key_manager.get_public_key(key_uri).await?;
        let method: &VerificationMethod = self
          .document
          .find_method_by_thumbprint(key_uri.thumbprint())
          .ok_or(Error::KeyNotInDidDocument)?;
        (public, method.id.clone())
      }
      None => {
        let method: VerificationMethod = self
          .document
          .default_signing_method()
          .cloned()
          .ok_or(Error::InvalidDocument("document declares no verification methods"))?;
        let jwk: &Jwk = method
          .public_key_jwk
          .as_ref()
          .ok_or(Error::InvalidDocument("signing method carries no public key"))?;
        let key_uri: KeyUri = KeyUri::from_jwk(jwk)?;
        let public: Jwk = self.key_manager.get_public_key(&key_uri).await?;
        (public, method.id.clone())
      }
    };

    let key_uri: KeyUri = KeyUri::from_jwk(&public)?;
    let algorithm: &str = CryptoAlg::from_jwk(&public)?.jws_name();
    let kid: String = qualify_method_id(&self.uri, &method_id);

    Ok(KeyManagerSigner::new(
      Arc::clone(&self.key_manager),
      key_uri,
      algorithm.to_owned(),
      kid,
    ))
  }

  /// Exports this DID with its private key material for transfer into
  /// another agent.
  pub async fn to_portable(&self) -> Result<PortableDid> {
    let mut verification_methods: Vec<PortableVerificationMethod> = Vec::new();

    for method in &self.document.verification_method {
      let public: &Jwk = method
        .public_key_jwk
        .as_ref()
        .ok_or(Error::InvalidDocument("verification method carries no public key"))?;
      let key_uri: KeyUri = KeyUri::from_jwk(public)?;

      let private_key_jwk: Option<Jwk> = match self.key_manager.export_key(&key_uri).await {
        Ok(private) => Some(private),
        Err(err) if matches!(err.kind(), KeyStorageErrorKind::KeyNotFound) => None,
        Err(err) => return Err(err.into()),
      };

      verification_methods.push(PortableVerificationMethod {
        id: method.id.clone(),
        type_: method.type_.clone(),
        controller: method.controller.clone(),
        public_key_jwk: public.clone(),
        private_key_jwk,
        purposes: self.document.method_purposes(&method.id),
      });
    }

    Ok(PortableDid {
      uri: self.uri.clone(),
      document: self.document.clone(),
      metadata: self.metadata.clone(),
      verification_methods,
    })
  }

  /// Reconstructs a bearer DID from portable form, importing the private
  /// keys into `key_manager`. Re-imports of already present keys are
  /// tolerated.
  pub async fn from_portable(portable: PortableDid, key_manager: Arc<dyn KeyManager>) -> Result<BearerDid> {
    for method in &portable.verification_methods {
      let Some(private) = &method.private_key_jwk else {
        continue;
      };
      match key_manager.import_key(private.clone()).await {
        Ok(_) => {}
        Err(err) if matches!(err.kind(), KeyStorageErrorKind::DuplicateKey) => {}
        Err(err) => return Err(err.into()),
      }
    }

    Ok(BearerDid::new(portable.uri, portable.document, portable.metadata, key_manager))
  }
}

impl Debug for BearerDid {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("BearerDid").field("uri", &self.uri).finish()
  }
}

/// One verification method of a [`PortableDid`], optionally carrying its
/// private key and the purposes it serves.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableVerificationMethod {
  /// Method id.
  pub id: String,
  /// Method type.
  #[serde(rename = "type")]
  pub type_: String,
  /// Controlling DID.
  pub controller: String,
  /// Public key.
  pub public_key_jwk: Jwk,
  /// Private key, present when the exporting key manager held it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub private_key_jwk: Option<Jwk>,
  /// Relationships referencing this method.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub purposes: Vec<VerificationRelationship>,
}

/// A self-contained, serializable DID export.
///
/// Importing a portable DID with complete private key material into a fresh
/// key manager yields a bearer DID equivalent to the original under
/// sign/verify.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableDid {
  /// The DID URI.
  pub uri: DidUri,
  /// The DID document.
  pub document: Document,
  /// Method metadata.
  #[serde(default)]
  pub metadata: DidMetadata,
  /// Per-method key material and purposes.
  pub verification_methods: Vec<PortableVerificationMethod>,
}

/// Expands a `#fragment` method id to an absolute DID URL.
pub(crate) fn qualify_method_id(did: &DidUri, method_id: &str) -> String {
  if let Some(fragment) = method_id.strip_prefix('#') {
    format!("{did}#{fragment}")
  } else {
    method_id.to_owned()
  }
}
