// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors that may occur when constructing or dispatching DWN messages.

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// This type represents all possible errors that can occur in the DWN
/// message layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Caused by message parameters that violate the interface's rules, or a
  /// raw message that does not validate.
  #[error("invalid DWN message: {0}")]
  InvalidMessage(String),
  /// Caused by a message type string with no known constructor.
  #[error("unknown DWN message type `{0}`")]
  UnknownMessageType(String),
  /// Caused by a failure to compute a content identifier.
  #[error("CID computation failed: {0}")]
  Cid(String),
  /// Caused by signing for an author whose private key is not present in
  /// the key manager.
  #[error("no signing key for `{0}` in the key manager")]
  KeyNotInKeyManager(String),
  /// Caused by an author DID that does not resolve to a usable document.
  #[error("author `{did}` did not resolve: {reason}")]
  UnresolvableAuthor {
    /// The author DID.
    did: String,
    /// The resolution error or document defect.
    reason: String,
  },
  /// Caused by cancelling an in-flight request. Cancelled requests commit
  /// nothing.
  #[error("the operation was cancelled")]
  Cancelled,
  /// Caused by a remote DWN call failing in transport. The underlying
  /// cause is preserved; retrying is the caller's policy.
  #[error("DWN transport failure: {message}")]
  Transport {
    /// Human-readable context.
    message: String,
    /// The underlying transport error.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
  },
  /// Caused by errors from the key manager while signing.
  #[error(transparent)]
  KeyStorage(#[from] dweb_crypto::KeyStorageError),
  /// Caused by errors from the JOSE layer.
  #[error(transparent)]
  Jose(#[from] dweb_jose::Error),
  /// Caused by JSON (de)serialization failures.
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Builds a [`Error::Transport`] preserving `source`.
  pub fn transport(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Transport {
      message: message.into(),
      source: Some(Box::new(source)),
    }
  }
}
