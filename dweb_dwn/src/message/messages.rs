// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The Messages interface: raw access to stored messages by CID or filter.

use serde::Deserialize;
use serde::Serialize;

use dweb_crypto::Signer;

use crate::authorization::Authorization;
use crate::authorization::SignaturePayload;
use crate::cid::compute_dag_cbor_cid;
use crate::error::Error;
use crate::error::Result;
use crate::message::current_timestamp;
use crate::message::Interface;
use crate::message::Method;

/// A filter over stored messages.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesFilter {
  /// Match messages of an interface, e.g. `Records`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub interface: Option<Interface>,
  /// Match messages of a method.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<Method>,
  /// Match messages bound to a protocol.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
}

macro_rules! messages_filter_message {
  ($(#[$doc:meta])* $message:ident, $descriptor:ident, $method:expr, $mismatch:literal) => {
    /// The descriptor of the corresponding Messages message.
    #[derive(Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct $descriptor {
      /// Always [`Interface::Messages`].
      pub interface: Interface,
      /// The method.
      pub method: Method,
      /// Time of the request.
      pub message_timestamp: String,
      /// Message selection.
      #[serde(default, skip_serializing_if = "Vec::is_empty")]
      pub filters: Vec<MessagesFilter>,
    }

    $(#[$doc])*
    #[derive(Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct $message {
      /// The descriptor.
      pub descriptor: $descriptor,
      /// The authorization block.
      #[serde(skip_serializing_if = "Option::is_none")]
      pub authorization: Option<Authorization>,
    }

    impl $message {
      /// Constructs and signs the message over `filters`.
      pub async fn create(filters: Vec<MessagesFilter>, signer: &dyn Signer) -> Result<Self> {
        let descriptor: $descriptor = $descriptor {
          interface: Interface::Messages,
          method: $method,
          message_timestamp: current_timestamp(),
          filters,
        };

        let payload: SignaturePayload = SignaturePayload::descriptor_only(compute_dag_cbor_cid(&descriptor)?);
        let authorization: Authorization = Authorization::create(&payload, signer).await?;

        Ok(Self {
          descriptor,
          authorization: Some(authorization),
        })
      }

      /// Parses and validates a raw message.
      pub fn parse(raw: serde_json::Value) -> Result<Self> {
        let message: Self = serde_json::from_value(raw)?;
        if message.descriptor.interface != Interface::Messages || message.descriptor.method != $method {
          return Err(Error::InvalidMessage($mismatch.to_owned()));
        }
        Ok(message)
      }
    }
  };
}

messages_filter_message!(
  /// A `MessagesQuery` message.
  MessagesQueryMessage,
  MessagesQueryDescriptor,
  Method::Query,
  "descriptor is not a MessagesQuery"
);
messages_filter_message!(
  /// A `MessagesSubscribe` message.
  MessagesSubscribeMessage,
  MessagesSubscribeDescriptor,
  Method::Subscribe,
  "descriptor is not a MessagesSubscribe"
);

/// The descriptor of a `MessagesGet`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesGetDescriptor {
  /// Always [`Interface::Messages`].
  pub interface: Interface,
  /// Always [`Method::Get`].
  pub method: Method,
  /// Time of the request.
  pub message_timestamp: String,
  /// CIDs of the messages to fetch.
  pub message_cids: Vec<String>,
}

/// A `MessagesGet` message.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesGetMessage {
  /// The descriptor.
  pub descriptor: MessagesGetDescriptor,
  /// The authorization block.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authorization: Option<Authorization>,
}

impl MessagesGetMessage {
  /// Constructs and signs a `MessagesGet` for `message_cids`.
  pub async fn create(message_cids: Vec<String>, signer: &dyn Signer) -> Result<Self> {
    let descriptor: MessagesGetDescriptor = MessagesGetDescriptor {
      interface: Interface::Messages,
      method: Method::Get,
      message_timestamp: current_timestamp(),
      message_cids,
    };

    let payload: SignaturePayload = SignaturePayload::descriptor_only(compute_dag_cbor_cid(&descriptor)?);
    let authorization: Authorization = Authorization::create(&payload, signer).await?;

    Ok(Self {
      descriptor,
      authorization: Some(authorization),
    })
  }

  /// Parses and validates a raw `MessagesGet`.
  pub fn parse(raw: serde_json::Value) -> Result<Self> {
    let message: Self = serde_json::from_value(raw)?;
    if message.descriptor.interface != Interface::Messages || message.descriptor.method != Method::Get {
      return Err(Error::InvalidMessage("descriptor is not a MessagesGet".to_owned()));
    }
    Ok(message)
  }
}
