// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The agent facade: one tenant context binding the vault, key manager,
//! DID subsystem, identity records, permissions and the request pipeline.

use core::fmt::Debug;
use core::fmt::Formatter;
use std::sync::Arc;

use futures::future::AbortRegistration;

use dweb_crypto::KeyManager;
use dweb_crypto::KeyStorageErrorKind;
use dweb_did::BearerDid;
use dweb_did::DidMetadata;
use dweb_did::DidUri;
use dweb_did::PortableDid;
use dweb_did::Resolver;
use dweb_dwn::DwnExecutor;
use dweb_dwn::DwnMessageReply;
use dweb_dwn::DwnRequest;
use dweb_jose::Jwk;
use dweb_permissions::PermissionsApi;
use dweb_storage::Identity;
use dweb_storage::IdentityMetadata;
use dweb_storage::IdentityStore;
use dweb_storage::Vault;
use dweb_storage::VaultStatus;

use crate::did_api::DidRequest;
use crate::did_api::DidResponse;
use crate::error::Error;
use crate::error::Result;
use crate::pipeline::DwnApi;

/// Parameters of [`Agent::create_identity`].
#[derive(Clone, Debug)]
pub struct CreateIdentityOptions {
  /// DID method of the new identity.
  pub method: String,
  /// Human-readable label.
  pub name: String,
  /// Owning tenant; the identity's own DID URI when absent.
  pub tenant: Option<String>,
  /// Creation options handed to the method back-end.
  pub options: dweb_did::CreateOptions,
}

impl CreateIdentityOptions {
  /// A `did:jwk` identity named `name` under its own tenant.
  pub fn new(method: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      method: method.into(),
      name: name.into(),
      tenant: None,
      options: dweb_did::CreateOptions::default(),
    }
  }
}

/// The DWN agent.
///
/// Construction goes through [`AgentBuilder`](crate::builder::AgentBuilder).
/// Freshly built agents are dormant: `first_launch` tells whether a vault
/// exists, `initialize` seeds one, and `start` unlocks it, after which the
/// agent DID signs and all APIs operate.
pub struct Agent {
  vault: Vault,
  key_manager: Arc<dyn KeyManager>,
  resolver: Arc<Resolver>,
  identities: IdentityStore,
  dwn: Arc<DwnApi>,
  permissions: PermissionsApi<DwnApi>,
}

impl Agent {
  pub(crate) fn assemble(
    vault: Vault,
    key_manager: Arc<dyn KeyManager>,
    resolver: Arc<Resolver>,
    identities: IdentityStore,
    dwn: Arc<DwnApi>,
    permissions: PermissionsApi<DwnApi>,
  ) -> Self {
    Self {
      vault,
      key_manager,
      resolver,
      identities,
      dwn,
      permissions,
    }
  }

  // ===========================================================================
  // Lifecycle
  // ===========================================================================

  /// Returns `true` until a vault has been initialized.
  pub async fn first_launch(&self) -> Result<bool> {
    Ok(!self.vault.is_initialized().await?)
  }

  /// Seeds the vault and derives the agent DID. Returns the recovery
  /// mnemonic.
  pub async fn initialize(&self, passphrase: &str, recovery_phrase: Option<String>) -> Result<String> {
    Ok(self.vault.initialize(passphrase, recovery_phrase).await?)
  }

  /// Unlocks the vault and brings the agent DID online: its identity key
  /// enters the key manager and its signer backs every subsequent
  /// agent-authored message.
  pub async fn start(&self, passphrase: &str) -> Result<()> {
    self.vault.unlock(passphrase).await?;

    let identity_jwk: Jwk = self.vault.agent_identity_jwk()?;
    match self.key_manager.import_key(identity_jwk).await {
      Ok(_) => {}
      Err(err) if matches!(err.kind(), KeyStorageErrorKind::DuplicateKey) => {}
      Err(err) => return Err(err.into()),
    }

    let agent_did_uri: String = self.vault.agent_did_uri().await?;
    let resolution = self.resolver.resolve(&agent_did_uri).await;
    let document = resolution.did_document.ok_or_else(|| Error::UnresolvableDid {
      did: agent_did_uri.clone(),
      reason: resolution
        .did_resolution_metadata
        .error
        .map(|error| error.to_string())
        .unwrap_or_else(|| "no document".to_owned()),
    })?;

    let bearer: BearerDid = BearerDid::new(
      DidUri::parse(&agent_did_uri)?,
      document,
      DidMetadata::default(),
      Arc::clone(&self.key_manager),
    );
    self.dwn.set_agent(bearer);

    tracing::info!(agent_did = %agent_did_uri, "agent started");

    Ok(())
  }

  /// Locks the vault and takes the agent signer offline.
  pub fn lock(&self) -> Result<()> {
    self.dwn.clear_agent();
    Ok(self.vault.lock()?)
  }

  /// The vault lifecycle state.
  pub async fn status(&self) -> Result<VaultStatus> {
    Ok(self.vault.status().await?)
  }

  /// The vault, for backup/restore and passphrase management.
  pub fn vault(&self) -> &Vault {
    &self.vault
  }

  /// The agent's own DID. Requires a started agent.
  pub fn agent_did(&self) -> Result<BearerDid> {
    self.dwn.agent().ok_or(Error::NotStarted)
  }

  // ===========================================================================
  // Subsystem access
  // ===========================================================================

  /// The DID resolver.
  pub fn resolver(&self) -> &Arc<Resolver> {
    &self.resolver
  }

  /// The key manager.
  pub fn key_manager(&self) -> &Arc<dyn KeyManager> {
    &self.key_manager
  }

  /// The permissions API.
  pub fn permissions(&self) -> &PermissionsApi<DwnApi> {
    &self.permissions
  }

  /// The request pipeline, usable as a [`DwnExecutor`] capability.
  pub fn dwn(&self) -> &Arc<DwnApi> {
    &self.dwn
  }

  // ===========================================================================
  // DID requests
  // ===========================================================================

  /// Routes a DID operation. `Update` and `Deactivate` fail with
  /// [`Error::NotImplemented`].
  pub async fn process_did_request(&self, request: DidRequest) -> Result<DidResponse> {
    match request {
      DidRequest::Create { method, options } => {
        let backend = self
          .resolver
          .method(&method)
          .ok_or_else(|| dweb_did::Error::MethodNotSupported(method.clone()))?;
        let bearer: BearerDid = backend.create(&self.key_manager, options).await?;
        Ok(DidResponse::Created(Box::new(bearer)))
      }
      DidRequest::Resolve { did } => Ok(DidResponse::Resolved(Box::new(self.resolver.resolve(&did).await))),
      DidRequest::Update { .. } => Err(Error::NotImplemented("DidUpdate")),
      DidRequest::Deactivate { .. } => Err(Error::NotImplemented("DidDeactivate")),
    }
  }

  // ===========================================================================
  // Identity management
  // ===========================================================================

  /// Creates a DID, persists its keys, and records the identity under its
  /// tenant.
  pub async fn create_identity(&self, options: CreateIdentityOptions) -> Result<BearerDid> {
    let backend = self
      .resolver
      .method(&options.method)
      .ok_or_else(|| dweb_did::Error::MethodNotSupported(options.method.clone()))?;

    let bearer: BearerDid = backend.create(&self.key_manager, options.options).await?;
    let uri: String = bearer.uri.to_string();

    let identity: Identity = Identity {
      did: public_portable(&bearer).await?,
      metadata: IdentityMetadata {
        name: options.name,
        tenant: options.tenant.unwrap_or_else(|| uri.clone()),
        uri,
      },
    };
    self.identities.set(&identity, true).await?;

    Ok(bearer)
  }

  /// Lists the identities recorded under `tenant`.
  pub async fn list_identities(&self, tenant: &str) -> Result<Vec<Identity>> {
    Ok(self.identities.list(tenant).await?)
  }

  /// Retrieves one identity record.
  pub async fn get_identity(&self, tenant: &str, uri: &str) -> Result<Option<Identity>> {
    Ok(self.identities.get(tenant, uri).await?)
  }

  /// Deletes an identity record. Key material stays in the key manager.
  pub async fn delete_identity(&self, tenant: &str, uri: &str) -> Result<()> {
    Ok(self.identities.delete(tenant, uri).await?)
  }

  /// Exports an identity with its private key material.
  pub async fn export_identity(&self, tenant: &str, uri: &str) -> Result<PortableDid> {
    let identity: Identity = self
      .identities
      .get(tenant, uri)
      .await?
      .ok_or(dweb_storage::Error::IdentityNotFound)?;

    let bearer: BearerDid = BearerDid::new(
      identity.did.uri,
      identity.did.document,
      identity.did.metadata,
      Arc::clone(&self.key_manager),
    );

    Ok(bearer.to_portable().await?)
  }

  /// Imports a portable identity: private keys enter the key manager, the
  /// record is persisted under its tenant.
  pub async fn import_identity(&self, portable: PortableDid, name: impl Into<String>) -> Result<BearerDid> {
    let bearer: BearerDid = BearerDid::from_portable(portable, Arc::clone(&self.key_manager)).await?;
    let uri: String = bearer.uri.to_string();

    let identity: Identity = Identity {
      did: public_portable(&bearer).await?,
      metadata: IdentityMetadata {
        name: name.into(),
        tenant: uri.clone(),
        uri,
      },
    };
    self.identities.set(&identity, true).await?;

    Ok(bearer)
  }

  // ===========================================================================
  // DWN requests
  // ===========================================================================

  /// Builds, signs and processes `request` against the local DWN.
  pub async fn process_dwn_request(&self, request: DwnRequest) -> Result<DwnMessageReply> {
    Ok(self.dwn.process_dwn_request(request).await?)
  }

  /// As [`Agent::process_dwn_request`], aborting at `abort`.
  pub async fn process_dwn_request_cancellable(
    &self,
    request: DwnRequest,
    abort: AbortRegistration,
  ) -> Result<DwnMessageReply> {
    Ok(self.dwn.process_cancellable(request, abort).await?)
  }

  /// Builds, signs and sends `request` to the target's remote DWN.
  pub async fn send_dwn_request(&self, request: DwnRequest) -> Result<DwnMessageReply> {
    Ok(self.dwn.send_dwn_request(request).await?)
  }
}

impl Debug for Agent {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Agent").finish()
  }
}

/// The identity record form of a DID: document and purposes, no private
/// key material. Private keys live in the key manager only.
async fn public_portable(bearer: &BearerDid) -> Result<PortableDid> {
  let mut portable: PortableDid = bearer.to_portable().await?;
  for method in &mut portable.verification_methods {
    method.private_key_jwk = None;
  }
  Ok(portable)
}
