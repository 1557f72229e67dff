// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DWN message envelopes the agent constructs and consumes.

mod messages;
mod protocols;
mod records;

pub use messages::*;
pub use protocols::*;
pub use records::*;

use core::fmt::Display;
use core::fmt::Formatter;
use std::collections::BTreeMap;

use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::cid::compute_dag_cbor_cid;
use crate::error::Error;
use crate::error::Result;

/// DWN interfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Interface {
  /// Record storage and retrieval.
  Records,
  /// Protocol installation and discovery.
  Protocols,
  /// Raw message access.
  Messages,
}

/// DWN methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Method {
  /// Write a record.
  Write,
  /// Read a single record or message.
  Read,
  /// Query by filter.
  Query,
  /// Delete a record.
  Delete,
  /// Subscribe to matching events.
  Subscribe,
  /// Install a protocol definition.
  Configure,
  /// Fetch messages by CID.
  Get,
}

/// A fully-qualified message type: interface plus method, e.g.
/// `RecordsWrite`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageType {
  /// The interface.
  pub interface: Interface,
  /// The method.
  pub method: Method,
}

impl MessageType {
  /// `RecordsWrite`
  pub const RECORDS_WRITE: MessageType = MessageType::new(Interface::Records, Method::Write);
  /// `RecordsRead`
  pub const RECORDS_READ: MessageType = MessageType::new(Interface::Records, Method::Read);
  /// `RecordsQuery`
  pub const RECORDS_QUERY: MessageType = MessageType::new(Interface::Records, Method::Query);
  /// `RecordsDelete`
  pub const RECORDS_DELETE: MessageType = MessageType::new(Interface::Records, Method::Delete);
  /// `RecordsSubscribe`
  pub const RECORDS_SUBSCRIBE: MessageType = MessageType::new(Interface::Records, Method::Subscribe);
  /// `ProtocolsConfigure`
  pub const PROTOCOLS_CONFIGURE: MessageType = MessageType::new(Interface::Protocols, Method::Configure);
  /// `ProtocolsQuery`
  pub const PROTOCOLS_QUERY: MessageType = MessageType::new(Interface::Protocols, Method::Query);
  /// `MessagesGet`
  pub const MESSAGES_GET: MessageType = MessageType::new(Interface::Messages, Method::Get);
  /// `MessagesQuery`
  pub const MESSAGES_QUERY: MessageType = MessageType::new(Interface::Messages, Method::Query);
  /// `MessagesSubscribe`
  pub const MESSAGES_SUBSCRIBE: MessageType = MessageType::new(Interface::Messages, Method::Subscribe);

  /// Composes a message type.
  pub const fn new(interface: Interface, method: Method) -> Self {
    Self { interface, method }
  }

  /// Parses the concatenated form, e.g. `"RecordsWrite"`.
  pub fn from_name(name: &str) -> Result<Self> {
    let (interface, rest): (Interface, &str) = if let Some(rest) = name.strip_prefix("Records") {
      (Interface::Records, rest)
    } else if let Some(rest) = name.strip_prefix("Protocols") {
      (Interface::Protocols, rest)
    } else if let Some(rest) = name.strip_prefix("Messages") {
      (Interface::Messages, rest)
    } else {
      return Err(Error::UnknownMessageType(name.to_owned()));
    };

    let method: Method = match rest {
      "Write" => Method::Write,
      "Read" => Method::Read,
      "Query" => Method::Query,
      "Delete" => Method::Delete,
      "Subscribe" => Method::Subscribe,
      "Configure" => Method::Configure,
      "Get" => Method::Get,
      _ => return Err(Error::UnknownMessageType(name.to_owned())),
    };

    Ok(Self::new(interface, method))
  }

  /// Returns `true` for Records-interface types.
  pub const fn is_records(&self) -> bool {
    matches!(self.interface, Interface::Records)
  }
}

impl Display for MessageType {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{:?}{:?}", self.interface, self.method)
  }
}

/// Record tags: string-keyed values attached to a record descriptor.
pub type Tags = BTreeMap<String, serde_json::Value>;

/// The current DWN timestamp: RFC 3339 with microsecond precision.
pub fn current_timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Any DWN message the agent constructs or parses.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Message {
  /// A `RecordsWrite`.
  RecordsWrite(RecordsWriteMessage),
  /// A `RecordsRead`.
  RecordsRead(RecordsReadMessage),
  /// A `RecordsQuery`.
  RecordsQuery(RecordsQueryMessage),
  /// A `RecordsDelete`.
  RecordsDelete(RecordsDeleteMessage),
  /// A `RecordsSubscribe`.
  RecordsSubscribe(RecordsSubscribeMessage),
  /// A `ProtocolsConfigure`.
  ProtocolsConfigure(ProtocolsConfigureMessage),
  /// A `ProtocolsQuery`.
  ProtocolsQuery(ProtocolsQueryMessage),
  /// A `MessagesGet`.
  MessagesGet(MessagesGetMessage),
  /// A `MessagesQuery`.
  MessagesQuery(MessagesQueryMessage),
  /// A `MessagesSubscribe`.
  MessagesSubscribe(MessagesSubscribeMessage),
}

impl Message {
  /// Parses a raw message, dispatching on its descriptor's interface and
  /// method.
  pub fn parse(raw: serde_json::Value) -> Result<Self> {
    let interface: &str = raw
      .pointer("/descriptor/interface")
      .and_then(serde_json::Value::as_str)
      .ok_or_else(|| Error::InvalidMessage("descriptor.interface is missing".to_owned()))?;
    let method: &str = raw
      .pointer("/descriptor/method")
      .and_then(serde_json::Value::as_str)
      .ok_or_else(|| Error::InvalidMessage("descriptor.method is missing".to_owned()))?;

    let message_type: MessageType = MessageType::from_name(&format!("{interface}{method}"))?;

    Ok(match message_type {
      MessageType::RECORDS_WRITE => Self::RecordsWrite(RecordsWriteMessage::parse(raw)?),
      MessageType::RECORDS_READ => Self::RecordsRead(RecordsReadMessage::parse(raw)?),
      MessageType::RECORDS_QUERY => Self::RecordsQuery(RecordsQueryMessage::parse(raw)?),
      MessageType::RECORDS_DELETE => Self::RecordsDelete(RecordsDeleteMessage::parse(raw)?),
      MessageType::RECORDS_SUBSCRIBE => Self::RecordsSubscribe(RecordsSubscribeMessage::parse(raw)?),
      MessageType::PROTOCOLS_CONFIGURE => Self::ProtocolsConfigure(ProtocolsConfigureMessage::parse(raw)?),
      MessageType::PROTOCOLS_QUERY => Self::ProtocolsQuery(ProtocolsQueryMessage::parse(raw)?),
      MessageType::MESSAGES_GET => Self::MessagesGet(MessagesGetMessage::parse(raw)?),
      MessageType::MESSAGES_QUERY => Self::MessagesQuery(MessagesQueryMessage::parse(raw)?),
      MessageType::MESSAGES_SUBSCRIBE => Self::MessagesSubscribe(MessagesSubscribeMessage::parse(raw)?),
      other => return Err(Error::UnknownMessageType(other.to_string())),
    })
  }

  /// The message's type.
  pub fn message_type(&self) -> MessageType {
    match self {
      Self::RecordsWrite(_) => MessageType::RECORDS_WRITE,
      Self::RecordsRead(_) => MessageType::RECORDS_READ,
      Self::RecordsQuery(_) => MessageType::RECORDS_QUERY,
      Self::RecordsDelete(_) => MessageType::RECORDS_DELETE,
      Self::RecordsSubscribe(_) => MessageType::RECORDS_SUBSCRIBE,
      Self::ProtocolsConfigure(_) => MessageType::PROTOCOLS_CONFIGURE,
      Self::ProtocolsQuery(_) => MessageType::PROTOCOLS_QUERY,
      Self::MessagesGet(_) => MessageType::MESSAGES_GET,
      Self::MessagesQuery(_) => MessageType::MESSAGES_QUERY,
      Self::MessagesSubscribe(_) => MessageType::MESSAGES_SUBSCRIBE,
    }
  }

  /// Computes the message CID: a DAG-CBOR CIDv1 over the message with any
  /// embedded record data (`encodedData`) excluded.
  pub fn compute_cid(&self) -> Result<String> {
    let mut value: serde_json::Value = serde_json::to_value(self)?;
    if let Some(object) = value.as_object_mut() {
      object.remove("encodedData");
    }
    compute_dag_cbor_cid(&value)
  }

  /// The author DID, read from the `kid` of the first authorization
  /// signature. `None` for unsigned messages.
  pub fn author(&self) -> Option<String> {
    let authorization = match self {
      Self::RecordsWrite(message) => message.authorization.as_ref(),
      Self::RecordsRead(message) => message.authorization.as_ref(),
      Self::RecordsQuery(message) => message.authorization.as_ref(),
      Self::RecordsDelete(message) => message.authorization.as_ref(),
      Self::RecordsSubscribe(message) => message.authorization.as_ref(),
      Self::ProtocolsConfigure(message) => message.authorization.as_ref(),
      Self::ProtocolsQuery(message) => message.authorization.as_ref(),
      Self::MessagesGet(message) => message.authorization.as_ref(),
      Self::MessagesQuery(message) => message.authorization.as_ref(),
      Self::MessagesSubscribe(message) => message.authorization.as_ref(),
    }?;
    authorization.author()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_type_names_roundtrip() {
    for (name, expected) in [
      ("RecordsWrite", MessageType::RECORDS_WRITE),
      ("RecordsQuery", MessageType::RECORDS_QUERY),
      ("ProtocolsConfigure", MessageType::PROTOCOLS_CONFIGURE),
      ("MessagesGet", MessageType::MESSAGES_GET),
    ] {
      let parsed: MessageType = MessageType::from_name(name).unwrap();
      assert_eq!(parsed, expected);
      assert_eq!(parsed.to_string(), name);
    }

    assert!(MessageType::from_name("RecordsGrant").is_err());
    assert!(MessageType::from_name("Eventsevery").is_err());
  }

  #[test]
  fn timestamps_use_microsecond_rfc3339() {
    let timestamp: String = current_timestamp();
    assert!(timestamp.ends_with('Z'));
    // 2024-01-01T00:00:00.000000Z
    assert_eq!(timestamp.len(), 27);
  }
}
