// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised while handling JOSE objects.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Caused by a JWK that is missing a required member or carries an
  /// inconsistent combination of members.
  #[error("invalid JWK: {0}")]
  InvalidKey(&'static str),
  /// Caused by a key type for which no thumbprint member set is defined.
  #[error("no RFC 7638 member set for key type `{0}`")]
  UnsupportedKeyType(String),
  /// Caused by reading a signature from a JWS that carries none.
  #[error("JWS carries no signatures")]
  MissingSignature,
  /// Caused by malformed base64url content.
  #[error("invalid base64url data")]
  InvalidBase64(#[from] base64ct::Error),
  /// Caused by JSON (de)serialization failures.
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}
