// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The agent's local [`KeyManager`] implementation.

use core::fmt::Debug;
use core::fmt::Formatter;
use std::sync::Arc;

use async_trait::async_trait;

use dweb_crypto::registry;
use dweb_crypto::CryptoAlg;
use dweb_crypto::KeyManager;
use dweb_crypto::KeyManagerResult;
use dweb_crypto::KeyStorageError;
use dweb_crypto::KeyStorageErrorKind;
use dweb_crypto::KeyUri;
use dweb_jose::Jwk;

use crate::storage::KeyValueStore;
use crate::storage::MemStore;

/// A content-addressed JWK store over a [`KeyValueStore`] partition.
///
/// Key records live under `{tenant}/keys/{key_uri}`; the tenant prefix is
/// what keeps one tenant's key material invisible to another. All
/// cryptographic operations dispatch through the algorithm registry.
pub struct LocalKeyManager {
  store: Arc<dyn KeyValueStore>,
  tenant: String,
}

impl LocalKeyManager {
  /// The tenant keys live under before an agent DID exists.
  pub const DEFAULT_TENANT: &'static str = "agent";

  /// Creates a key manager over an in-memory store.
  pub fn new_in_memory() -> Self {
    Self::new(Arc::new(MemStore::new()), Self::DEFAULT_TENANT)
  }

  /// Creates a key manager over `store`, scoped to `tenant`.
  pub fn new(store: Arc<dyn KeyValueStore>, tenant: impl Into<String>) -> Self {
    Self {
      store,
      tenant: tenant.into(),
    }
  }

  /// Returns a key manager over the same store scoped to another tenant.
  pub fn partition(&self, tenant: impl Into<String>) -> Self {
    Self {
      store: Arc::clone(&self.store),
      tenant: tenant.into(),
    }
  }

  /// The tenant this manager is scoped to.
  pub fn tenant(&self) -> &str {
    &self.tenant
  }

  fn record_key(&self, key_uri: &KeyUri) -> String {
    format!("{}/keys/{key_uri}", self.tenant)
  }

  async fn load(&self, key_uri: &KeyUri) -> KeyManagerResult<Jwk> {
    let record: Option<Vec<u8>> = self
      .store
      .get(&self.record_key(key_uri))
      .await
      .map_err(|err| KeyStorageError::new(KeyStorageErrorKind::Io).with_source(err))?;

    let bytes: Vec<u8> = record.ok_or_else(|| {
      KeyStorageError::new(KeyStorageErrorKind::KeyNotFound).with_custom_message(format!("no key at `{key_uri}`"))
    })?;

    serde_json::from_slice(&bytes).map_err(|err| KeyStorageError::new(KeyStorageErrorKind::Io).with_source(err))
  }

  async fn persist(&self, key_uri: &KeyUri, jwk: &Jwk) -> KeyManagerResult<()> {
    let bytes: Vec<u8> =
      serde_json::to_vec(jwk).map_err(|err| KeyStorageError::new(KeyStorageErrorKind::Io).with_source(err))?;

    self
      .store
      .set(&self.record_key(key_uri), bytes)
      .await
      .map_err(|err| KeyStorageError::new(KeyStorageErrorKind::Io).with_source(err))
  }
}

#[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
#[cfg_attr(feature = "send-sync-storage", async_trait)]
impl KeyManager for LocalKeyManager {
  async fn generate_key(&self, algorithm: CryptoAlg) -> KeyManagerResult<KeyUri> {
    let jwk: Jwk = registry::generate_key(algorithm)?;
    let key_uri: KeyUri = KeyUri::from_jwk(&jwk)?;

    self.persist(&key_uri, &jwk).await?;

    Ok(key_uri)
  }

  async fn import_key(&self, key: Jwk) -> KeyManagerResult<KeyUri> {
    if !key.is_private() {
      return Err(
        KeyStorageError::new(KeyStorageErrorKind::InvalidKey).with_custom_message("imported keys must be private"),
      );
    }
    // Reject keys the registry cannot serve before they hit storage.
    CryptoAlg::from_jwk(&key)?;

    // Deep copy with `kid` pinned to the thumbprint when absent.
    let mut key: Jwk = key.clone();
    if key.kid.is_none() {
      key.kid = Some(key.thumbprint_sha256_b64().map_err(dweb_crypto::Error::from)?);
    }

    let key_uri: KeyUri = KeyUri::from_jwk(&key)?;
    if self.exists(&key_uri).await? {
      return Err(
        KeyStorageError::new(KeyStorageErrorKind::DuplicateKey).with_custom_message(format!("`{key_uri}` is stored already")),
      );
    }

    self.persist(&key_uri, &key).await?;

    Ok(key_uri)
  }

  async fn export_key(&self, key_uri: &KeyUri) -> KeyManagerResult<Jwk> {
    self.load(key_uri).await
  }

  async fn get_public_key(&self, key_uri: &KeyUri) -> KeyManagerResult<Jwk> {
    let private: Jwk = self.load(key_uri).await?;
    Ok(registry::public_key(&private)?)
  }

  async fn sign(&self, key_uri: &KeyUri, data: &[u8]) -> KeyManagerResult<Vec<u8>> {
    let private: Jwk = self.load(key_uri).await?;
    Ok(registry::sign(&private, data)?)
  }

  async fn verify(&self, key: &Jwk, signature: &[u8], data: &[u8]) -> KeyManagerResult<bool> {
    Ok(registry::verify(key, signature, data)?)
  }

  async fn exists(&self, key_uri: &KeyUri) -> KeyManagerResult<bool> {
    let record: Option<Vec<u8>> = self
      .store
      .get(&self.record_key(key_uri))
      .await
      .map_err(|err| KeyStorageError::new(KeyStorageErrorKind::Io).with_source(err))?;
    Ok(record.is_some())
  }
}

impl Debug for LocalKeyManager {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("LocalKeyManager").field("tenant", &self.tenant).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn generate_sign_verify() {
    let key_manager: LocalKeyManager = LocalKeyManager::new_in_memory();

    let key_uri: KeyUri = key_manager.generate_key(CryptoAlg::Ed25519).await.unwrap();
    let public: Jwk = key_manager.get_public_key(&key_uri).await.unwrap();
    assert_eq!(KeyUri::from_jwk(&public).unwrap(), key_uri);

    let signature: Vec<u8> = key_manager.sign(&key_uri, b"data").await.unwrap();
    assert!(key_manager.verify(&public, &signature, b"data").await.unwrap());
    assert!(!key_manager.verify(&public, &signature, b"tampered").await.unwrap());
  }

  #[tokio::test]
  async fn import_requires_private_key_and_prevents_duplicates() {
    let key_manager: LocalKeyManager = LocalKeyManager::new_in_memory();
    let private: Jwk = dweb_crypto::registry::generate_key(CryptoAlg::Secp256k1).unwrap();

    let err = key_manager.import_key(private.to_public()).await.unwrap_err();
    assert!(matches!(err.kind(), KeyStorageErrorKind::InvalidKey));

    let key_uri: KeyUri = key_manager.import_key(private.clone()).await.unwrap();
    assert_eq!(key_uri, KeyUri::from_jwk(&private).unwrap());

    let err = key_manager.import_key(private).await.unwrap_err();
    assert!(matches!(err.kind(), KeyStorageErrorKind::DuplicateKey));
  }

  #[tokio::test]
  async fn missing_keys_fail_with_key_not_found() {
    let key_manager: LocalKeyManager = LocalKeyManager::new_in_memory();
    let key_uri: KeyUri = "urn:jwk:doesnotexist".parse().unwrap();

    let err = key_manager.export_key(&key_uri).await.unwrap_err();
    assert!(matches!(err.kind(), KeyStorageErrorKind::KeyNotFound));
    assert!(!key_manager.exists(&key_uri).await.unwrap());
  }

  #[tokio::test]
  async fn tenants_are_partitioned() {
    let key_manager: LocalKeyManager = LocalKeyManager::new_in_memory();
    let other: LocalKeyManager = key_manager.partition("did:example:bob");

    let key_uri: KeyUri = key_manager.generate_key(CryptoAlg::Ed25519).await.unwrap();

    assert!(key_manager.exists(&key_uri).await.unwrap());
    assert!(!other.exists(&key_uri).await.unwrap());
    let err = other.export_key(&key_uri).await.unwrap_err();
    assert!(matches!(err.kind(), KeyStorageErrorKind::KeyNotFound));
  }
}
