// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The Protocols interface: configure and query.

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

/// A protocol definition as installed into a DWN. Rule enforcement lives in
/// the DWN engine; the agent treats the type and structure trees as opaque.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDefinition {
  /// The protocol URI.
  pub protocol: String,
  /// Whether records under the protocol are publicly discoverable.
  pub published: bool,
  /// Record type declarations.
  pub types: serde_json::Value,
  /// The protocol's record structure and rule tree.
  pub structure: serde_json::Value,
}

/// The descriptor of a `ProtocolsConfigure`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsConfigureDescriptor {
  /// Always [`Interface::Protocols`].
  pub interface: Interface,
  /// Always [`Method::Configure`].
  pub method: Method,
  /// Time of the request.
  pub message_timestamp: String,
  /// The definition to install.
  pub definition: ProtocolDefinition,
}

/// A `ProtocolsConfigure` message.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsConfigureMessage {
  /// The descriptor.
  pub descriptor: ProtocolsConfigureDescriptor,
  /// The authorization block.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authorization: Option<Authorization>,
}

impl ProtocolsConfigureMessage {
  /// Constructs and signs a `ProtocolsConfigure` installing `definition`.
  pub async fn create(definition: ProtocolDefinition, signer: &dyn Signer) -> Result<Self> {
    let descriptor: ProtocolsConfigureDescriptor = ProtocolsConfigureDescriptor {
      interface: Interface::Protocols,
      method: Method::Configure,
      message_timestamp: current_timestamp(),
      definition,
    };

    let payload: SignaturePayload = SignaturePayload::descriptor_only(compute_dag_cbor_cid(&descriptor)?);
    let authorization: Authorization = Authorization::create(&payload, signer).await?;

    Ok(Self {
      descriptor,
      authorization: Some(authorization),
    })
  }

  /// Parses and validates a raw `ProtocolsConfigure`.
  pub fn parse(raw: serde_json::Value) -> Result<Self> {
    let message: Self = serde_json::from_value(raw)?;
    if message.descriptor.interface != Interface::Protocols || message.descriptor.method != Method::Configure {
      return Err(Error::InvalidMessage("descriptor is not a ProtocolsConfigure".to_owned()));
    }
    Ok(message)
  }
}

/// Filter of a `ProtocolsQuery`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsQueryFilter {
  /// Match a single protocol URI.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
}

/// The descriptor of a `ProtocolsQuery`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsQueryDescriptor {
  /// Always [`Interface::Protocols`].
  pub interface: Interface,
  /// Always [`Method::Query`].
  pub method: Method,
  /// Time of the request.
  pub message_timestamp: String,
  /// Protocol selection; absent lists all visible protocols.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub filter: Option<ProtocolsQueryFilter>,
}

/// A `ProtocolsQuery` message.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolsQueryMessage {
  /// The descriptor.
  pub descriptor: ProtocolsQueryDescriptor,
  /// The authorization block; absent on anonymous queries.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authorization: Option<Authorization>,
}

impl ProtocolsQueryMessage {
  /// Constructs and signs a `ProtocolsQuery`.
  pub async fn create(filter: Option<ProtocolsQueryFilter>, signer: &dyn Signer) -> Result<Self> {
    let descriptor: ProtocolsQueryDescriptor = ProtocolsQueryDescriptor {
      interface: Interface::Protocols,
      method: Method::Query,
      message_timestamp: current_timestamp(),
      filter,
    };

    let payload: SignaturePayload = SignaturePayload::descriptor_only(compute_dag_cbor_cid(&descriptor)?);
    let authorization: Authorization = Authorization::create(&payload, signer).await?;

    Ok(Self {
      descriptor,
      authorization: Some(authorization),
    })
  }

  /// Parses and validates a raw `ProtocolsQuery`.
  pub fn parse(raw: serde_json::Value) -> Result<Self> {
    let message: Self = serde_json::from_value(raw)?;
    if message.descriptor.interface != Interface::Protocols || message.descriptor.method != Method::Query {
      return Err(Error::InvalidMessage("descriptor is not a ProtocolsQuery".to_owned()));
    }
    Ok(message)
  }
}
