// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use core::fmt::Debug;

use async_trait::async_trait;

use dweb_jose::Jwk;

use crate::algorithm::CryptoAlg;
use crate::error::KeyStorageError;
use crate::key_uri::KeyUri;

#[cfg(not(feature = "send-sync-storage"))]
mod key_manager_sub_trait {
  pub trait KeyManagerSendSyncMaybe {}
  impl<S: super::KeyManager> KeyManagerSendSyncMaybe for S {}
}

#[cfg(feature = "send-sync-storage")]
mod key_manager_sub_trait {
  pub trait KeyManagerSendSyncMaybe: Send + Sync {}
  impl<S: Send + Sync + super::KeyManager> KeyManagerSendSyncMaybe for S {}
}

/// Alias for a `Result` with the error type [`KeyStorageError`].
pub type KeyManagerResult<T> = core::result::Result<T, KeyStorageError>;

/// An opaque store of private JWKs addressed by [`KeyUri`].
///
/// Each key is owned by exactly one agent context and logically scoped to a
/// tenant; implementations must never return one tenant's key material to a
/// query issued for another tenant.
///
/// Invariants every implementation upholds:
///
/// - `get_public_key(uri)` returns a JWK whose key URI equals `uri`, for any
///   `uri` produced by [`generate_key`](Self::generate_key) or
///   [`import_key`](Self::import_key).
/// - `verify(get_public_key(uri), sign(uri, data), data)` is `true`.
/// - A missing key fails with
///   [`KeyNotFound`](crate::KeyStorageErrorKind::KeyNotFound); lookups never
///   silently return nothing.
#[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
#[cfg_attr(feature = "send-sync-storage", async_trait)]
pub trait KeyManager: key_manager_sub_trait::KeyManagerSendSyncMaybe + Debug {
  /// Generates a fresh private key for `algorithm`, stores it under its key
  /// URI and returns that URI.
  async fn generate_key(&self, algorithm: CryptoAlg) -> KeyManagerResult<KeyUri>;

  /// Imports an existing private JWK (the `d` member is required) and
  /// returns its key URI. Duplicate imports are rejected.
  async fn import_key(&self, key: Jwk) -> KeyManagerResult<KeyUri>;

  /// Returns the stored private JWK.
  async fn export_key(&self, key_uri: &KeyUri) -> KeyManagerResult<Jwk>;

  /// Returns the public JWK for the stored key, derived via the algorithm
  /// registry.
  async fn get_public_key(&self, key_uri: &KeyUri) -> KeyManagerResult<Jwk>;

  /// Computes the content-addressed URI of `key`. Pure; never touches the
  /// backing store.
  fn get_key_uri(&self, key: &Jwk) -> KeyManagerResult<KeyUri> {
    KeyUri::from_jwk(key).map_err(KeyStorageError::from)
  }

  /// Signs `data` with the key stored under `key_uri`.
  async fn sign(&self, key_uri: &KeyUri, data: &[u8]) -> KeyManagerResult<Vec<u8>>;

  /// Verifies `signature` over `data` with the given public JWK.
  async fn verify(&self, key: &Jwk, signature: &[u8], data: &[u8]) -> KeyManagerResult<bool>;

  /// Returns `true` if a key is stored under `key_uri`.
  async fn exists(&self, key_uri: &KeyUri) -> KeyManagerResult<bool>;
}
