// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The capability set a DID method back-end provides.

use std::sync::Arc;

use async_trait::async_trait;

use dweb_crypto::CryptoAlg;
use dweb_crypto::KeyManager;

use crate::bearer::BearerDid;
use crate::document::Document;
use crate::document::VerificationMethod;
use crate::error::Error;
use crate::error::Result;
use crate::resolution::ResolutionResult;

/// Options accepted by [`DidMethod::create`].
#[derive(Clone, Copy, Debug)]
pub struct CreateOptions {
  /// The algorithm of the DID's initial key.
  pub algorithm: CryptoAlg,
}

impl Default for CreateOptions {
  fn default() -> Self {
    Self {
      algorithm: CryptoAlg::Ed25519,
    }
  }
}

/// A DID method back-end: creation, resolution, and selection of the
/// method's signing verification method.
///
/// Method polymorphism is a plain capability set over trait objects; the
/// [`Resolver`](crate::resolver::Resolver) keeps one registered instance per
/// method name.
#[async_trait]
pub trait DidMethod: Send + Sync {
  /// The method name, e.g. `"jwk"`.
  fn name(&self) -> &'static str;

  /// Creates a new DID of this method. Generated private keys are persisted
  /// in `key_manager`.
  async fn create(&self, key_manager: &Arc<dyn KeyManager>, options: CreateOptions) -> Result<BearerDid>;

  /// Resolves `did`. Negative outcomes are reported in the result's
  /// resolution metadata, never as an error.
  async fn resolve(&self, did: &str) -> ResolutionResult;

  /// Selects the verification method used for signing on behalf of this
  /// DID. The default picks the first `assertionMethod`, falling back to
  /// the first declared verification method.
  fn get_signing_method(&self, document: &Document) -> Result<VerificationMethod> {
    document
      .default_signing_method()
      .cloned()
      .ok_or(Error::InvalidDocument("document declares no verification methods"))
  }
}
