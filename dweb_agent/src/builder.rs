// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use dweb_did::DidDht;
use dweb_did::DidJwk;
use dweb_did::DidKey;
use dweb_did::DidMethod;
use dweb_did::DidWeb;
use dweb_did::Resolver;
use dweb_dwn::DwnNode;
use dweb_dwn::DwnServerRpc;
use dweb_dwn::HttpDwnRpc;
use dweb_permissions::PermissionsApi;
use dweb_permissions::DEFAULT_GRANT_TTL;
use dweb_storage::IdentityStore;
use dweb_storage::KeyValueStore;
use dweb_storage::LocalKeyManager;
use dweb_storage::MemStore;
use dweb_storage::Vault;

use crate::agent::Agent;
use crate::error::Error;
use crate::error::Result;
use crate::pipeline::DwnApi;

/// An [`Agent`] builder for easier agent configuration.
pub struct AgentBuilder {
  store: Arc<dyn KeyValueStore>,
  node: Option<Arc<dyn DwnNode>>,
  rpc: Arc<dyn DwnServerRpc>,
  work_factor: usize,
  resolution_ttl: Duration,
  grant_ttl: Duration,
  methods: Vec<Arc<dyn DidMethod>>,
}

impl AgentBuilder {
  /// Creates a new `AgentBuilder` with in-memory storage and the built-in
  /// DID methods.
  pub fn new() -> Self {
    Self {
      store: Arc::new(MemStore::new()),
      node: None,
      rpc: Arc::new(HttpDwnRpc::new()),
      work_factor: Vault::DEFAULT_WORK_FACTOR,
      resolution_ttl: dweb_did::resolver::DEFAULT_CACHE_TTL,
      grant_ttl: DEFAULT_GRANT_TTL,
      methods: Vec::new(),
    }
  }

  /// Sets the persistent store backing vault, keys and identity records.
  pub fn storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
    self.store = store;
    self
  }

  /// Sets the local DWN engine. Required.
  pub fn dwn_node(mut self, node: Arc<dyn DwnNode>) -> Self {
    self.node = Some(node);
    self
  }

  /// Sets the RPC client used for remote sends.
  pub fn rpc_client(mut self, rpc: Arc<dyn DwnServerRpc>) -> Self {
    self.rpc = rpc;
    self
  }

  /// Sets the vault KDF work factor. Tests use a small value.
  pub fn vault_work_factor(mut self, work_factor: usize) -> Self {
    self.work_factor = work_factor;
    self
  }

  /// Sets the DID resolution cache TTL.
  pub fn resolution_cache_ttl(mut self, ttl: Duration) -> Self {
    self.resolution_ttl = ttl;
    self
  }

  /// Sets the grant lookup cache TTL.
  pub fn grant_cache_ttl(mut self, ttl: Duration) -> Self {
    self.grant_ttl = ttl;
    self
  }

  /// Registers an additional DID method back-end.
  pub fn register_method(mut self, method: Arc<dyn DidMethod>) -> Self {
    self.methods.push(method);
    self
  }

  /// Creates the [`Agent`] based on the builder configuration.
  pub fn build(self) -> Result<Agent> {
    let node = self.node.ok_or(Error::MissingDwnNode)?;

    let mut resolver: Resolver = Resolver::with_ttl(self.resolution_ttl);
    resolver.register(Arc::new(DidDht));
    resolver.register(Arc::new(DidJwk));
    resolver.register(Arc::new(DidKey));
    resolver.register(Arc::new(DidWeb::new()));
    for method in self.methods {
      resolver.register(method);
    }
    let resolver: Arc<Resolver> = Arc::new(resolver);

    let key_manager: Arc<dyn dweb_crypto::KeyManager> =
      Arc::new(LocalKeyManager::new(Arc::clone(&self.store), LocalKeyManager::DEFAULT_TENANT));
    let vault: Vault = Vault::with_work_factor(Arc::clone(&self.store), self.work_factor);
    let identities: IdentityStore = IdentityStore::new(Arc::clone(&self.store));

    let dwn: Arc<DwnApi> = Arc::new(DwnApi::new(
      Arc::clone(&key_manager),
      Arc::clone(&resolver),
      node,
      self.rpc,
    ));
    let permissions: PermissionsApi<DwnApi> = PermissionsApi::with_cache_ttl(Arc::clone(&dwn), self.grant_ttl);

    Ok(Agent::assemble(vault, key_manager, resolver, identities, dwn, permissions))
  }
}

impl Default for AgentBuilder {
  fn default() -> Self {
    Self::new()
  }
}
