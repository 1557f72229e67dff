// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The Records interface: write, read, query, delete, subscribe.

use serde::Deserialize;
use serde::Serialize;

use dweb_crypto::Signer;
use dweb_jose::jwu;

use crate::authorization::Authorization;
use crate::authorization::SignaturePayload;
use crate::cid::compute_dag_cbor_cid;
use crate::cid::compute_data_cid;
use crate::error::Error;
use crate::error::Result;
use crate::message::current_timestamp;
use crate::message::Interface;
use crate::message::Method;
use crate::message::Tags;

/// The descriptor of a `RecordsWrite`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsWriteDescriptor {
  /// Always [`Interface::Records`].
  pub interface: Interface,
  /// Always [`Method::Write`].
  pub method: Method,
  /// Time of this write.
  pub message_timestamp: String,
  /// Protocol URI governing the record.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  /// Path of the record's type within the protocol.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol_path: Option<String>,
  /// DID the record is addressed to.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recipient: Option<String>,
  /// Schema URI of the record payload.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub schema: Option<String>,
  /// Record id of the parent record, for nested protocol records.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
  /// DAG-PB CID of the record data.
  pub data_cid: String,
  /// Size of the record data in bytes.
  pub data_size: usize,
  /// Creation time of the logical record.
  pub date_created: String,
  /// Whether the record is publicly readable.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub published: Option<bool>,
  /// Publication time.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date_published: Option<String>,
  /// Media type of the record data.
  pub data_format: String,
  /// String-keyed tags for indexed lookup.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<Tags>,
}

/// Parameters accepted by [`RecordsWriteMessage::create`].
#[derive(Clone, Debug, Default)]
pub struct RecordsWriteOptions {
  /// Media type of the record data. Required.
  pub data_format: String,
  /// Inline record data; mutually exclusive with `data_cid`.
  pub data: Option<Vec<u8>>,
  /// Precomputed data CID; requires `data_size`.
  pub data_cid: Option<String>,
  /// Size of the data addressed by `data_cid`.
  pub data_size: Option<usize>,
  /// Protocol URI; requires `protocol_path`.
  pub protocol: Option<String>,
  /// Protocol path; requires `protocol`.
  pub protocol_path: Option<String>,
  /// Protocol role the author invokes.
  pub protocol_role: Option<String>,
  /// DID the record is addressed to.
  pub recipient: Option<String>,
  /// Schema URI.
  pub schema: Option<String>,
  /// Tags.
  pub tags: Option<Tags>,
  /// Explicit record id; derived from the entry id when absent.
  pub record_id: Option<String>,
  /// Context id of the parent record.
  pub parent_context_id: Option<String>,
  /// Explicit creation date; now when absent.
  pub date_created: Option<String>,
  /// Explicit message timestamp; now when absent.
  pub message_timestamp: Option<String>,
  /// Publish the record.
  pub published: Option<bool>,
  /// Explicit publication date.
  pub date_published: Option<String>,
  /// Id of the permission grant authorizing the write.
  pub permission_grant_id: Option<String>,
  /// CID of the delegated grant under which the author acts.
  pub delegated_grant_id: Option<String>,
}

/// A `RecordsWrite` message.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsWriteMessage {
  /// The record id: the entry id of the initial write.
  pub record_id: String,
  /// The record's position in its protocol context tree.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context_id: Option<String>,
  /// The descriptor.
  pub descriptor: RecordsWriteDescriptor,
  /// The authorization block.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authorization: Option<Authorization>,
  /// base64url record data, embedded for small payloads.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub encoded_data: Option<String>,
}

impl RecordsWriteMessage {
  /// Constructs and signs a `RecordsWrite`.
  ///
  /// Computes the data CID when inline data is given, derives the record id
  /// from the entry id, chains the context id under the parent's, and signs
  /// the resulting payload.
  pub async fn create(options: RecordsWriteOptions, signer: &dyn Signer) -> Result<Self> {
    if options.protocol.is_some() != options.protocol_path.is_some() {
      return Err(Error::InvalidMessage(
        "`protocol` and `protocolPath` are mutually inclusive".to_owned(),
      ));
    }
    if options.data.is_some() == options.data_cid.is_some() {
      return Err(Error::InvalidMessage(
        "exactly one of `data` and `dataCid` is required".to_owned(),
      ));
    }
    if options.data_cid.is_some() && options.data_size.is_none() {
      return Err(Error::InvalidMessage("`dataCid` requires `dataSize`".to_owned()));
    }
    if options.data_format.is_empty() {
      return Err(Error::InvalidMessage("`dataFormat` is required".to_owned()));
    }

    let (data_cid, data_size, encoded_data): (String, usize, Option<String>) = match &options.data {
      Some(data) => (compute_data_cid(data), data.len(), Some(jwu::encode_b64(data))),
      None => (
        options.data_cid.clone().expect("checked above"),
        options.data_size.expect("checked above"),
        None,
      ),
    };

    let now: String = current_timestamp();
    let descriptor: RecordsWriteDescriptor = RecordsWriteDescriptor {
      interface: Interface::Records,
      method: Method::Write,
      message_timestamp: options.message_timestamp.clone().unwrap_or_else(|| now.clone()),
      protocol: options.protocol.clone(),
      protocol_path: options.protocol_path.clone(),
      recipient: options.recipient.clone(),
      schema: options.schema.clone(),
      parent_id: parent_id_of(options.parent_context_id.as_deref()),
      data_cid,
      data_size,
      date_created: options.date_created.clone().unwrap_or_else(|| now.clone()),
      published: options.published,
      date_published: options
        .date_published
        .clone()
        .or_else(|| options.published.filter(|published| *published).map(|_| now.clone())),
      data_format: options.data_format.clone(),
      tags: options.tags.clone(),
    };

    let author: String = author_of(signer);
    let record_id: String = match options.record_id.clone() {
      Some(record_id) => record_id,
      None => Self::entry_id(&descriptor, &author)?,
    };

    // Context ids only exist under protocols; children chain below their
    // parent's context.
    let context_id: Option<String> = if descriptor.protocol.is_some() {
      match options.parent_context_id.as_deref().filter(|parent| !parent.is_empty()) {
        Some(parent) => Some(format!("{parent}/{record_id}")),
        None => Some(record_id.clone()),
      }
    } else {
      None
    };

    let payload: SignaturePayload = SignaturePayload {
      record_id: Some(record_id.clone()),
      descriptor_cid: compute_dag_cbor_cid(&descriptor)?,
      context_id: context_id.clone(),
      protocol_role: options.protocol_role.clone(),
      permission_grant_id: options.permission_grant_id.clone(),
      delegated_grant_id: options.delegated_grant_id.clone(),
    };
    let authorization: Authorization = Authorization::create(&payload, signer).await?;

    Ok(Self {
      record_id,
      context_id,
      descriptor,
      authorization: Some(authorization),
      encoded_data,
    })
  }

  /// Parses and validates a raw `RecordsWrite`.
  pub fn parse(raw: serde_json::Value) -> Result<Self> {
    let message: Self = serde_json::from_value(raw)?;
    if message.descriptor.interface != Interface::Records || message.descriptor.method != Method::Write {
      return Err(Error::InvalidMessage("descriptor is not a RecordsWrite".to_owned()));
    }
    if message.descriptor.protocol.is_some() != message.descriptor.protocol_path.is_some() {
      return Err(Error::InvalidMessage(
        "`protocol` and `protocolPath` are mutually inclusive".to_owned(),
      ));
    }
    Ok(message)
  }

  /// The deterministic entry id: the DAG-CBOR CID of the descriptor with
  /// the author DID mixed in.
  pub fn entry_id(descriptor: &RecordsWriteDescriptor, author: &str) -> Result<String> {
    let mut value: serde_json::Value = serde_json::to_value(descriptor)?;
    value
      .as_object_mut()
      .expect("a descriptor serializes to an object")
      .insert("author".to_owned(), serde_json::Value::String(author.to_owned()));
    compute_dag_cbor_cid(&value)
  }

  /// Attaches the tenant owner's signature, authorizing storage of a
  /// foreign-authored message in the owner's own DWN.
  pub async fn sign_as_owner(&mut self, signer: &dyn Signer) -> Result<()> {
    let authorization: &mut Authorization = self
      .authorization
      .as_mut()
      .ok_or_else(|| Error::InvalidMessage("cannot owner-sign an unsigned RecordsWrite".to_owned()))?;

    let payload: SignaturePayload = SignaturePayload::descriptor_only(compute_dag_cbor_cid(&self.descriptor)?);
    authorization.owner_signature = Some(crate::authorization::sign_general_jws(&serde_json::to_vec(&payload)?, signer).await?);

    Ok(())
  }
}

/// A filter over records, shared by read, query, delete and subscribe.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsFilter {
  /// Match a single record id.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub record_id: Option<String>,
  /// Match records of a protocol.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  /// Match records at a protocol path.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol_path: Option<String>,
  /// Match children of a record.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
  /// Match records within a context subtree.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context_id: Option<String>,
  /// Match records addressed to a DID.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recipient: Option<String>,
  /// Match records of a schema.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub schema: Option<String>,
  /// Match records of a data format.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data_format: Option<String>,
  /// Match records carrying all given tags.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<Tags>,
}

macro_rules! records_request_message {
  ($(#[$doc:meta])* $message:ident, $descriptor:ident, $method:expr, $mismatch:literal) => {
    /// The descriptor of the corresponding Records message.
    #[derive(Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct $descriptor {
      /// Always [`Interface::Records`].
      pub interface: Interface,
      /// The method.
      pub method: Method,
      /// Time of the request.
      pub message_timestamp: String,
      /// Record selection.
      pub filter: RecordsFilter,
    }

    $(#[$doc])*
    #[derive(Clone, Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct $message {
      /// The descriptor.
      pub descriptor: $descriptor,
      /// The authorization block; absent on anonymous requests.
      #[serde(skip_serializing_if = "Option::is_none")]
      pub authorization: Option<Authorization>,
    }

    impl $message {
      /// Constructs and signs the message over `filter`.
      pub async fn create(filter: RecordsFilter, signer: &dyn Signer) -> Result<Self> {
        let descriptor: $descriptor = $descriptor {
          interface: Interface::Records,
          method: $method,
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

      /// Parses and validates a raw message.
      pub fn parse(raw: serde_json::Value) -> Result<Self> {
        let message: Self = serde_json::from_value(raw)?;
        if message.descriptor.interface != Interface::Records || message.descriptor.method != $method {
          return Err(Error::InvalidMessage($mismatch.to_owned()));
        }
        Ok(message)
      }
    }
  };
}

records_request_message!(
  /// A `RecordsRead` message.
  RecordsReadMessage,
  RecordsReadDescriptor,
  Method::Read,
  "descriptor is not a RecordsRead"
);
records_request_message!(
  /// A `RecordsQuery` message.
  RecordsQueryMessage,
  RecordsQueryDescriptor,
  Method::Query,
  "descriptor is not a RecordsQuery"
);
records_request_message!(
  /// A `RecordsSubscribe` message.
  RecordsSubscribeMessage,
  RecordsSubscribeDescriptor,
  Method::Subscribe,
  "descriptor is not a RecordsSubscribe"
);

/// The descriptor of a `RecordsDelete`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsDeleteDescriptor {
  /// Always [`Interface::Records`].
  pub interface: Interface,
  /// Always [`Method::Delete`].
  pub method: Method,
  /// Time of the request.
  pub message_timestamp: String,
  /// The record to delete.
  pub record_id: String,
  /// Also delete descendant records.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prune: Option<bool>,
}

/// A `RecordsDelete` message.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsDeleteMessage {
  /// The descriptor.
  pub descriptor: RecordsDeleteDescriptor,
  /// The authorization block.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authorization: Option<Authorization>,
}

impl RecordsDeleteMessage {
  /// Constructs and signs a `RecordsDelete` for `record_id`.
  pub async fn create(record_id: String, prune: Option<bool>, signer: &dyn Signer) -> Result<Self> {
    let descriptor: RecordsDeleteDescriptor = RecordsDeleteDescriptor {
      interface: Interface::Records,
      method: Method::Delete,
      message_timestamp: current_timestamp(),
      record_id,
      prune,
    };

    let payload: SignaturePayload = SignaturePayload::descriptor_only(compute_dag_cbor_cid(&descriptor)?);
    let authorization: Authorization = Authorization::create(&payload, signer).await?;

    Ok(Self {
      descriptor,
      authorization: Some(authorization),
    })
  }

  /// Parses and validates a raw `RecordsDelete`.
  pub fn parse(raw: serde_json::Value) -> Result<Self> {
    let message: Self = serde_json::from_value(raw)?;
    if message.descriptor.interface != Interface::Records || message.descriptor.method != Method::Delete {
      return Err(Error::InvalidMessage("descriptor is not a RecordsDelete".to_owned()));
    }
    Ok(message)
  }
}

fn parent_id_of(parent_context_id: Option<&str>) -> Option<String> {
  parent_context_id?
    .split('/')
    .filter(|segment| !segment.is_empty())
    .next_back()
    .map(str::to_owned)
}

fn author_of(signer: &dyn Signer) -> String {
  let kid: &str = signer.key_id();
  kid.split('#').next().unwrap_or(kid).to_owned()
}
