// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Per-tenant persistence of managed identities.

use core::fmt::Debug;
use core::fmt::Formatter;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use dweb_did::PortableDid;

use crate::error::Error;
use crate::error::Result;
use crate::storage::KeyValueStore;

/// Descriptive metadata of a managed identity.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMetadata {
  /// Human-readable label.
  pub name: String,
  /// The DID owning the identity's data partition. Defaults to the
  /// identity's own URI (a self-sovereign tenant).
  pub tenant: String,
  /// The identity's DID URI.
  pub uri: String,
}

/// A managed identity: its DID (in portable form) plus metadata.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  /// The identity's DID with key references.
  pub did: PortableDid,
  /// Descriptive metadata.
  pub metadata: IdentityMetadata,
}

/// CRUD over identity records, partitioned by tenant.
///
/// Records live under `{tenant}/identities/{did_uri}`; listing scans a
/// tenant prefix only, so one tenant's identities are invisible to another.
pub struct IdentityStore {
  store: Arc<dyn KeyValueStore>,
}

impl IdentityStore {
  /// Creates an identity store over `store`.
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  fn record_key(tenant: &str, uri: &str) -> String {
    format!("{tenant}/identities/{uri}")
  }

  /// Persists `identity` under its tenant.
  ///
  /// With `prevent_duplicates` an existing record under the same id fails
  /// with [`Error::IdentityAlreadyExists`].
  pub async fn set(&self, identity: &Identity, prevent_duplicates: bool) -> Result<()> {
    let key: String = Self::record_key(&identity.metadata.tenant, &identity.metadata.uri);

    if prevent_duplicates && self.store.get(&key).await?.is_some() {
      return Err(Error::IdentityAlreadyExists);
    }

    self.store.set(&key, serde_json::to_vec(identity)?).await
  }

  /// Retrieves the identity with the given URI within `tenant`.
  pub async fn get(&self, tenant: &str, uri: &str) -> Result<Option<Identity>> {
    match self.store.get(&Self::record_key(tenant, uri)).await? {
      Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  /// Lists every identity stored for `tenant`.
  pub async fn list(&self, tenant: &str) -> Result<Vec<Identity>> {
    let prefix: String = format!("{tenant}/identities/");
    let mut identities: Vec<Identity> = Vec::new();

    for key in self.store.list_keys(&prefix).await? {
      if let Some(bytes) = self.store.get(&key).await? {
        identities.push(serde_json::from_slice(&bytes)?);
      }
    }

    Ok(identities)
  }

  /// Deletes the identity with the given URI within `tenant`.
  ///
  /// Fails with [`Error::IdentityNotFound`] when no such record exists.
  pub async fn delete(&self, tenant: &str, uri: &str) -> Result<()> {
    if !self.store.delete(&Self::record_key(tenant, uri)).await? {
      return Err(Error::IdentityNotFound);
    }
    Ok(())
  }
}

impl Debug for IdentityStore {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str("IdentityStore")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemStore;
  use dweb_did::DidMetadata;
  use dweb_did::DidUri;
  use dweb_did::Document;

  fn identity(uri: &str, tenant: Option<&str>) -> Identity {
    let did: DidUri = DidUri::parse(uri).unwrap();
    Identity {
      did: PortableDid {
        uri: did.clone(),
        document: Document::new(uri),
        metadata: DidMetadata::default(),
        verification_methods: Vec::new(),
      },
      metadata: IdentityMetadata {
        name: "Test".to_owned(),
        tenant: tenant.unwrap_or(uri).to_owned(),
        uri: uri.to_owned(),
      },
    }
  }

  #[tokio::test]
  async fn set_get_list_delete() {
    let store: IdentityStore = IdentityStore::new(Arc::new(MemStore::new()));
    let alice: Identity = identity("did:example:alice", None);

    store.set(&alice, true).await.unwrap();
    assert!(store.get("did:example:alice", "did:example:alice").await.unwrap().is_some());
    assert_eq!(store.list("did:example:alice").await.unwrap().len(), 1);

    store.delete("did:example:alice", "did:example:alice").await.unwrap();
    assert!(store.get("did:example:alice", "did:example:alice").await.unwrap().is_none());
    assert!(matches!(
      store.delete("did:example:alice", "did:example:alice").await,
      Err(Error::IdentityNotFound)
    ));
  }

  #[tokio::test]
  async fn duplicate_prevention() {
    let store: IdentityStore = IdentityStore::new(Arc::new(MemStore::new()));
    let alice: Identity = identity("did:example:alice", None);

    store.set(&alice, true).await.unwrap();
    assert!(matches!(store.set(&alice, true).await, Err(Error::IdentityAlreadyExists)));
    // Overwrites are fine when duplicate prevention is off.
    store.set(&alice, false).await.unwrap();
  }

  #[tokio::test]
  async fn tenants_are_partitioned() {
    let store: IdentityStore = IdentityStore::new(Arc::new(MemStore::new()));

    // Two identities under distinct tenants.
    store.set(&identity("did:example:alice", None), true).await.unwrap();
    store
      .set(&identity("did:example:device", Some("did:example:alice")), true)
      .await
      .unwrap();
    store.set(&identity("did:example:bob", None), true).await.unwrap();

    let alice_tenant: Vec<Identity> = store.list("did:example:alice").await.unwrap();
    assert_eq!(alice_tenant.len(), 2);
    assert!(store.list("did:example:bob").await.unwrap().len() == 1);
    assert!(store.list("did:example:carol").await.unwrap().is_empty());
  }
}
