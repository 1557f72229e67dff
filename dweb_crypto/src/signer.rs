// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;

use crate::key_manager::KeyManager;
use crate::key_manager::KeyManagerResult;
use crate::key_uri::KeyUri;

#[cfg(not(feature = "send-sync-storage"))]
mod signer_sub_trait {
  pub trait SignerSendSyncMaybe {}
  impl<S: super::Signer> SignerSendSyncMaybe for S {}
}

#[cfg(feature = "send-sync-storage")]
mod signer_sub_trait {
  pub trait SignerSendSyncMaybe: Send + Sync {}
  impl<S: Send + Sync + super::Signer> SignerSendSyncMaybe for S {}
}

/// A signing capability bound to one key.
///
/// Message constructors receive a `Signer` instead of key material: the
/// private key never leaves the key manager that owns it.
#[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
#[cfg_attr(feature = "send-sync-storage", async_trait)]
pub trait Signer: signer_sub_trait::SignerSendSyncMaybe {
  /// The JWS algorithm name of the bound key.
  fn algorithm(&self) -> &str;

  /// The identifier placed in the protected header `kid`: a DID URL when
  /// the key belongs to a DID document, otherwise its key URI.
  fn key_id(&self) -> &str;

  /// Signs `data` with the bound key.
  async fn sign(&self, data: &[u8]) -> KeyManagerResult<Vec<u8>>;
}

/// A [`Signer`] delegating to a [`KeyManager`].
#[derive(Clone, Debug)]
pub struct KeyManagerSigner {
  key_manager: Arc<dyn KeyManager>,
  key_uri: KeyUri,
  algorithm: String,
  key_id: String,
}

impl KeyManagerSigner {
  /// Binds `key_uri` in `key_manager` to a signer advertising `algorithm`
  /// under the identifier `key_id`.
  pub fn new(key_manager: Arc<dyn KeyManager>, key_uri: KeyUri, algorithm: String, key_id: String) -> Self {
    Self {
      key_manager,
      key_uri,
      algorithm,
      key_id,
    }
  }

  /// Returns the key URI the signer is bound to.
  pub fn key_uri(&self) -> &KeyUri {
    &self.key_uri
  }
}

#[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
#[cfg_attr(feature = "send-sync-storage", async_trait)]
impl Signer for KeyManagerSigner {
  fn algorithm(&self) -> &str {
    &self.algorithm
  }

  fn key_id(&self) -> &str {
    &self.key_id
  }

  async fn sign(&self, data: &[u8]) -> KeyManagerResult<Vec<u8>> {
    self.key_manager.sign(&self.key_uri, data).await
  }
}
