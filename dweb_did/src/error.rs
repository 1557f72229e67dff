// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors that may occur when working with DIDs.

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// This type represents all possible errors that can occur in the DID
/// subsystem.
///
/// Resolution failures are deliberately *not* represented here: they travel
/// inside [`ResolutionResult`](crate::resolution::ResolutionResult) metadata
/// so that callers can distinguish "the resolver answered negatively" from
/// "the operation failed".
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Caused by a string that does not parse as a DID.
  #[error("invalid DID: {0}")]
  InvalidDid(String),
  /// Caused by a string that does not parse as a DID URL.
  #[error("invalid DID URL: {0}")]
  InvalidDidUrl(String),
  /// Caused by addressing a DID method with no registered implementation.
  #[error("DID method `{0}` is not registered")]
  MethodNotSupported(String),
  /// Caused by dereferencing a fragment or service that the resolved
  /// document does not contain.
  #[error("no resource `{0}` in DID document")]
  NotFound(String),
  /// Caused by constructing a signer for a key that is not listed in the
  /// DID document's verification methods.
  #[error("key is not referenced by the DID document")]
  KeyNotInDidDocument,
  /// Caused by a DID document that cannot back the requested operation,
  /// e.g. one without verification methods.
  #[error("unusable DID document: {0}")]
  InvalidDocument(&'static str),
  /// Caused by errors from the key manager.
  #[error(transparent)]
  KeyStorage(#[from] dweb_crypto::KeyStorageError),
  /// Caused by errors from the algorithm registry.
  #[error(transparent)]
  Crypto(#[from] dweb_crypto::Error),
  /// Caused by errors from the JOSE layer.
  #[error(transparent)]
  Jose(#[from] dweb_jose::Error),
}
