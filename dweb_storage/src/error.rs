// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors that may occur when working with agent storage.

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// This type represents all possible errors that can occur in the storage
/// layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Caused by attempting to read a poisoned shared resource.
  #[error("shared resource poisoned: read")]
  SharedReadPoisoned,
  /// Caused by attempting to write a poisoned shared resource.
  #[error("shared resource poisoned: write")]
  SharedWritePoisoned,
  /// Caused by using the vault before it was initialized.
  #[error("vault is not initialized")]
  NotInitialized,
  /// Caused by initializing a vault that already holds a sealed seed.
  #[error("vault is already initialized")]
  AlreadyInitialized,
  /// Caused by using seed-dependent operations while the vault is locked.
  #[error("vault is locked")]
  VaultLocked,
  /// Caused by a passphrase that does not open the sealed seed.
  ///
  /// Deliberately also covers corrupted-blob decryption failures so callers
  /// cannot distinguish the two cases.
  #[error("incorrect passphrase")]
  IncorrectPassphrase,
  /// Caused by a backup payload that does not parse as a vault blob.
  #[error("invalid vault backup")]
  InvalidBackup,
  /// Caused by a failing cryptographic primitive inside the vault.
  #[error("vault crypto operation failed: {0}")]
  VaultCrypto(String),
  /// Caused by storing an identity whose id already exists while duplicate
  /// prevention is on.
  #[error("identity already exists")]
  IdentityAlreadyExists,
  /// Caused by looking up an identity that is not stored.
  #[error("identity not found")]
  IdentityNotFound,
  /// Caused by errors from the DID subsystem.
  #[error(transparent)]
  Did(#[from] dweb_did::Error),
  /// Caused by errors from the algorithm registry.
  #[error(transparent)]
  Crypto(#[from] dweb_crypto::Error),
  /// Caused by errors from the JOSE layer.
  #[error(transparent)]
  Jose(#[from] dweb_jose::Error),
  /// Caused by (de)serialization of persisted records.
  #[error(transparent)]
  Serialization(#[from] serde_json::Error),
}
