// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors that may occur when operating the agent.

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// This type represents all possible errors that can occur in the agent
/// facade. The kind of every underlying failure is preserved through the
/// transparent variants.
#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
pub enum Error {
  /// Caused by using the agent's DID or signer before `start` unlocked the
  /// vault.
  #[error("agent is not started")]
  NotStarted,
  /// Caused by a DID operation variant the agent does not implement.
  #[error("`{0}` is not implemented")]
  NotImplemented(&'static str),
  /// Caused by building an agent without a DWN node.
  #[error("a DWN node is required to build an agent")]
  MissingDwnNode,
  /// Caused by a DID that does not resolve to a document.
  #[error("`{did}` did not resolve: {reason}")]
  UnresolvableDid {
    /// The DID.
    did: String,
    /// The resolution error.
    reason: String,
  },
  /// Caused by errors from the storage layer (vault, key records,
  /// identity records).
  #[error(transparent)]
  Storage(#[from] dweb_storage::Error),
  /// Caused by errors from the DID subsystem.
  #[error(transparent)]
  Did(#[from] dweb_did::Error),
  /// Caused by errors from the DWN message layer and request pipeline.
  #[error(transparent)]
  Dwn(#[from] dweb_dwn::Error),
  /// Caused by errors from the permissions subsystem.
  #[error(transparent)]
  Permissions(#[from] dweb_permissions::Error),
  /// Caused by errors from the key manager.
  #[error(transparent)]
  KeyStorage(#[from] dweb_crypto::KeyStorageError),
}

impl Error {
  /// Returns `true` for cancellation, at any wrapping depth.
  pub fn is_cancelled(&self) -> bool {
    matches!(self, Error::Dwn(dweb_dwn::Error::Cancelled))
  }
}
