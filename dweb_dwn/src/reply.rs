// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Replies returned by a DWN for processed messages.

use serde::Deserialize;
use serde::Serialize;

/// An HTTP-shaped status carried by every reply; DWN status codes are
/// surfaced to callers unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Status {
  /// Status code.
  pub code: u16,
  /// Human-readable detail.
  pub detail: String,
}

impl Status {
  /// `202 Accepted`: a write was accepted for processing.
  pub fn accepted() -> Self {
    Self {
      code: 202,
      detail: "Accepted".to_owned(),
    }
  }

  /// `200 OK`: a read or query succeeded.
  pub fn ok() -> Self {
    Self {
      code: 200,
      detail: "OK".to_owned(),
    }
  }

  /// `404 Not Found`: the addressed resource is absent.
  pub fn not_found() -> Self {
    Self {
      code: 404,
      detail: "Not Found".to_owned(),
    }
  }

  /// Returns `true` for 2xx codes. A `409` duplicate also counts as
  /// success: replaying an identical message is idempotent.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.code) || self.code == 409
  }
}

/// A single entry returned by a query or read: the stored message, plus its
/// data when the store chose to inline it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEntry {
  /// The stored message.
  #[serde(flatten)]
  pub message: serde_json::Value,
  /// base64url record data, when inlined.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub encoded_data: Option<String>,
}

/// The reply of `processMessage`, a union over all interfaces.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReply {
  /// Outcome status.
  pub status: Status,
  /// Matching entries; queries and reads.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub entries: Option<Vec<ReplyEntry>>,
  /// Pagination cursor.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cursor: Option<String>,
  /// The record id affected by a write.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub record_id: Option<String>,
}

impl MessageReply {
  /// A bare reply carrying only `status`.
  pub fn from_status(status: Status) -> Self {
    Self {
      status,
      entries: None,
      cursor: None,
      record_id: None,
    }
  }
}
