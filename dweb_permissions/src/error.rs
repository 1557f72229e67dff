// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors that may occur when working with permission grants.

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// This type represents all possible errors that can occur in the
/// permissions subsystem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Caused by a lookup for which no stored grant satisfies the matching
  /// predicate.
  #[error("no grant matches the request")]
  NoMatchingGrant,
  /// Caused by a matching grant whose `dateExpires` has passed.
  #[error("the matching grant is expired")]
  GrantExpired,
  /// Caused by a grant or revocation lookup the DWN answered with an
  /// unexpected status.
  #[error("permissions lookup failed: {0}")]
  PermissionsLookupFailed(String),
  /// Caused by the grantee-bound copy of a grant being rejected by the
  /// DWN. The grantor-side record exists at this point.
  #[error("grant delivery failed: {0}")]
  GrantDeliveryFailed(String),
  /// Caused by a record that does not parse as a permission grant, request
  /// or revocation.
  #[error("invalid permission record: {0}")]
  InvalidGrant(String),
  /// Caused by a scope carrying both `protocolPath` and `contextId`.
  #[error("`protocolPath` and `contextId` are mutually exclusive in a scope")]
  InvalidScope,
  /// Caused by errors from the DWN message layer.
  #[error(transparent)]
  Dwn(#[from] dweb_dwn::Error),
  /// Caused by JSON (de)serialization failures.
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}
