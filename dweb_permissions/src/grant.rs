// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Permission records: grants, requests and revocations.
//!
//! All three are plain `RecordsWrite` records under the permissions
//! protocol; their payload travels in the record data. Grants and requests
//! are top-level records, revocations are children of the grant they
//! revoke.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use dweb_jose::jwu;

use dweb_dwn::RecordsWriteMessage;

use crate::error::Error;
use crate::error::Result;
use crate::scope::PermissionScope;

/// The permissions protocol URI.
pub const PERMISSIONS_PROTOCOL: &str = "https://tbd.website/dwn/permissions";

/// `protocolPath` of grant records.
pub const GRANT_PATH: &str = "grant";
/// `protocolPath` of request records.
pub const REQUEST_PATH: &str = "request";
/// `protocolPath` of revocation records.
pub const REVOCATION_PATH: &str = "revocation";

/// The payload of a grant record.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantData {
  /// Expiry timestamp; the grant is dead afterwards.
  pub date_expires: String,
  /// When `true`, the grantee may act *as* the grantor within the scope.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delegated: Option<bool>,
  /// Id of the request record this grant answers.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,
  /// Human-readable reason.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// What the grant permits.
  pub scope: PermissionScope,
}

/// The payload of a request record.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
  /// The requested scope.
  pub scope: PermissionScope,
  /// Whether a delegated grant is requested.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delegated: Option<bool>,
  /// Human-readable reason.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// The payload of a revocation record.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationData {
  /// Human-readable reason.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// A parsed permission grant.
#[derive(Clone, Debug)]
pub struct PermissionGrant {
  /// The grant id: the record id of the underlying `RecordsWrite`.
  pub id: String,
  /// The DID that issued the grant.
  pub grantor: String,
  /// The DID the grant empowers.
  pub grantee: String,
  /// Issue timestamp.
  pub date_granted: String,
  /// The grant payload.
  pub data: GrantData,
  /// The underlying signed record, kept for embedding and revocation.
  pub message: RecordsWriteMessage,
}

impl PermissionGrant {
  /// Parses a grant from its underlying record.
  pub fn try_from_message(message: RecordsWriteMessage) -> Result<Self> {
    expect_permission_record(&message, GRANT_PATH)?;

    let data: GrantData = decode_payload(&message)?;
    data.scope.validate()?;

    let grantor: String = message_author(&message)?;
    let grantee: String = message
      .descriptor
      .recipient
      .clone()
      .ok_or_else(|| Error::InvalidGrant("grant carries no grantee".to_owned()))?;

    Ok(Self {
      id: message.record_id.clone(),
      grantor,
      grantee,
      date_granted: message.descriptor.message_timestamp.clone(),
      data,
      message,
    })
  }

  /// Returns `true` once `dateExpires` lies in the past.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&self.data.date_expires) {
      Ok(expires) => expires.with_timezone(&Utc) < now,
      // An unparseable expiry never authorizes anything.
      Err(_) => true,
    }
  }
}

/// A parsed permission request.
#[derive(Clone, Debug)]
pub struct PermissionRequest {
  /// The request id.
  pub id: String,
  /// The DID asking for the grant.
  pub requester: String,
  /// Request timestamp.
  pub date_requested: String,
  /// The request payload.
  pub data: RequestData,
  /// The underlying signed record.
  pub message: RecordsWriteMessage,
}

impl PermissionRequest {
  /// Parses a request from its underlying record.
  pub fn try_from_message(message: RecordsWriteMessage) -> Result<Self> {
    expect_permission_record(&message, REQUEST_PATH)?;

    let data: RequestData = decode_payload(&message)?;
    data.scope.validate()?;
    let requester: String = message_author(&message)?;

    Ok(Self {
      id: message.record_id.clone(),
      requester,
      date_requested: message.descriptor.message_timestamp.clone(),
      data,
      message,
    })
  }
}

/// A parsed permission revocation.
#[derive(Clone, Debug)]
pub struct PermissionRevocation {
  /// The id of the revoked grant, from the record's parent linkage.
  pub grant_id: String,
  /// Revocation timestamp.
  pub date_revoked: String,
  /// The revocation payload.
  pub data: RevocationData,
  /// The underlying signed record.
  pub message: RecordsWriteMessage,
}

impl PermissionRevocation {
  /// Parses a revocation from its underlying record.
  pub fn try_from_message(message: RecordsWriteMessage) -> Result<Self> {
    expect_permission_record(&message, REVOCATION_PATH)?;

    let data: RevocationData = decode_payload(&message)?;
    let grant_id: String = message
      .descriptor
      .parent_id
      .clone()
      .ok_or_else(|| Error::InvalidGrant("revocation carries no parent grant id".to_owned()))?;

    Ok(Self {
      grant_id,
      date_revoked: message.descriptor.message_timestamp.clone(),
      data,
      message,
    })
  }
}

fn expect_permission_record(message: &RecordsWriteMessage, path: &str) -> Result<()> {
  if message.descriptor.protocol.as_deref() != Some(PERMISSIONS_PROTOCOL) {
    return Err(Error::InvalidGrant(format!(
      "record does not use the permissions protocol (`{:?}`)",
      message.descriptor.protocol
    )));
  }
  if message.descriptor.protocol_path.as_deref() != Some(path) {
    return Err(Error::InvalidGrant(format!(
      "record is not a permissions `{path}` (`{:?}`)",
      message.descriptor.protocol_path
    )));
  }
  Ok(())
}

fn decode_payload<T: serde::de::DeserializeOwned>(message: &RecordsWriteMessage) -> Result<T> {
  let encoded: &str = message
    .encoded_data
    .as_deref()
    .ok_or_else(|| Error::InvalidGrant("permission record carries no data".to_owned()))?;
  let bytes: Vec<u8> =
    jwu::decode_b64(encoded).map_err(|err| Error::InvalidGrant(format!("undecodable record data: {err}")))?;
  Ok(serde_json::from_slice(&bytes)?)
}

fn message_author(message: &RecordsWriteMessage) -> Result<String> {
  message
    .authorization
    .as_ref()
    .and_then(dweb_dwn::Authorization::author)
    .ok_or_else(|| Error::InvalidGrant("permission record is unsigned".to_owned()))
}
