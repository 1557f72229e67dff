// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Permission scopes: which messages a grant covers.

use serde::Deserialize;
use serde::Serialize;

use dweb_dwn::Interface;
use dweb_dwn::MessageType;
use dweb_dwn::Method;

use crate::error::Error;
use crate::error::Result;

/// The scope of a grant: the interface and method it permits, optionally
/// narrowed to a protocol and, for Records, to a protocol path or a context
/// subtree.
///
/// `protocol_path` and `context_id` scoping are mutually exclusive;
/// [`PermissionScope::validate`] rejects scopes carrying both.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionScope {
  /// The permitted interface.
  pub interface: Interface,
  /// The permitted method.
  pub method: Method,
  /// The protocol the scope is bounded to.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  /// Restrict to records at this protocol path.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol_path: Option<String>,
  /// Restrict to records within this context subtree.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context_id: Option<String>,
}

impl PermissionScope {
  /// An unrestricted scope over `message_type`.
  pub fn new(message_type: MessageType) -> Self {
    Self {
      interface: message_type.interface,
      method: message_type.method,
      protocol: None,
      protocol_path: None,
      context_id: None,
    }
  }

  /// Bounds the scope to `protocol`.
  pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
    self.protocol = Some(protocol.into());
    self
  }

  /// Restricts the scope to records at `protocol_path`.
  pub fn with_protocol_path(mut self, protocol_path: impl Into<String>) -> Self {
    self.protocol_path = Some(protocol_path.into());
    self
  }

  /// Restricts the scope to the context subtree under `context_id`.
  pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
    self.context_id = Some(context_id.into());
    self
  }

  /// The message type this scope permits.
  pub fn message_type(&self) -> MessageType {
    MessageType::new(self.interface, self.method)
  }

  /// Rejects scopes mixing `protocolPath` and `contextId` restriction.
  pub fn validate(&self) -> Result<()> {
    if self.protocol_path.is_some() && self.context_id.is_some() {
      return Err(Error::InvalidScope);
    }
    Ok(())
  }

  /// Returns `true` for scopes over the Records interface.
  pub fn is_records(&self) -> bool {
    matches!(self.interface, Interface::Records)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mixed_restriction_is_rejected() {
    let scope: PermissionScope = PermissionScope::new(MessageType::RECORDS_WRITE)
      .with_protocol("https://protocol.example")
      .with_protocol_path("root")
      .with_context_id("ctx");

    assert!(matches!(scope.validate(), Err(Error::InvalidScope)));
  }

  #[test]
  fn serialized_form_is_camel_case() {
    let scope: PermissionScope = PermissionScope::new(MessageType::RECORDS_WRITE)
      .with_protocol("https://protocol.example")
      .with_protocol_path("root");

    let value: serde_json::Value = serde_json::to_value(&scope).unwrap();
    assert_eq!(value["interface"], "Records");
    assert_eq!(value["method"], "Write");
    assert_eq!(value["protocolPath"], "root");
    assert!(value.get("contextId").is_none());
  }
}
