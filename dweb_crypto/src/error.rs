// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use core::fmt::Display;
use core::fmt::Formatter;
use std::borrow::Cow;

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised by the signature algorithm registry.
///
/// All cryptographic failures are non-retryable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Caused by an `(alg, crv)` pair with no registered implementation.
  #[error("no algorithm registered for alg `{alg}` crv `{crv}`")]
  AlgorithmNotSupported {
    /// The requested JWS algorithm, or `-` when absent.
    alg: String,
    /// The requested curve, or `-` when absent.
    crv: String,
  },
  /// Caused by a JWK missing a member the selected algorithm requires, or
  /// carrying malformed key material.
  #[error("invalid key material: {0}")]
  InvalidKey(String),
  /// Caused by the underlying signature primitive rejecting an operation.
  #[error("signature operation failed: {0}")]
  SignatureFailure(String),
  /// Caused by errors from the JOSE layer.
  #[error(transparent)]
  Jose(#[from] dweb_jose::Error),
}

/// The specific cause of a [`KeyStorageError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyStorageErrorKind {
  /// The requested key does not exist in storage.
  KeyNotFound,
  /// The key material handed to the store is malformed or not private.
  InvalidKey,
  /// The key's algorithm has no registered implementation.
  AlgorithmNotSupported,
  /// A key with the same URI already exists and duplicates are prevented.
  DuplicateKey,
  /// The backing store failed.
  Io,
  /// Anything not covered by the other variants.
  Unspecified,
}

impl KeyStorageErrorKind {
  /// Returns a static description of the error kind.
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::KeyNotFound => "key not found",
      Self::InvalidKey => "invalid key material",
      Self::AlgorithmNotSupported => "algorithm not supported",
      Self::DuplicateKey => "key already exists",
      Self::Io => "storage operation failed",
      Self::Unspecified => "unspecified key storage failure",
    }
  }
}

impl Display for KeyStorageErrorKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An error produced by a [`KeyManager`][crate::KeyManager] implementation.
///
/// Carries the failure [kind](KeyStorageErrorKind), an optional custom
/// message, and an optional source error from the backing store.
#[derive(Debug)]
pub struct KeyStorageError {
  kind: KeyStorageErrorKind,
  message: Option<Cow<'static, str>>,
  source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl KeyStorageError {
  /// Constructs a new error of the given kind.
  pub fn new(kind: KeyStorageErrorKind) -> Self {
    Self {
      kind,
      message: None,
      source: None,
    }
  }

  /// Returns the cause of this error.
  pub const fn kind(&self) -> &KeyStorageErrorKind {
    &self.kind
  }

  /// Attaches a custom message.
  pub fn with_custom_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
    self.message = Some(message.into());
    self
  }

  /// Attaches the underlying cause.
  pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
    self.source = Some(source.into());
    self
  }
}

impl Display for KeyStorageError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.kind)?;
    if let Some(message) = &self.message {
      write!(f, " {message}")?;
    }
    Ok(())
  }
}

impl std::error::Error for KeyStorageError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    self.source.as_deref().map(|source| source as &(dyn std::error::Error + 'static))
  }
}

impl From<KeyStorageErrorKind> for KeyStorageError {
  fn from(kind: KeyStorageErrorKind) -> Self {
    Self::new(kind)
  }
}

impl From<Error> for KeyStorageError {
  fn from(error: Error) -> Self {
    let kind: KeyStorageErrorKind = match &error {
      Error::AlgorithmNotSupported { .. } => KeyStorageErrorKind::AlgorithmNotSupported,
      Error::InvalidKey(_) | Error::Jose(_) => KeyStorageErrorKind::InvalidKey,
      Error::SignatureFailure(_) => KeyStorageErrorKind::Unspecified,
    };
    Self::new(kind).with_source(error)
  }
}
