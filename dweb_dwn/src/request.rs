// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The request surface of the DWN pipeline.
//!
//! Subsystems that need to issue DWN messages (the permissions API, record
//! stores) depend on the [`DwnExecutor`] capability instead of holding a
//! reference back to the agent, keeping the ownership graph one-way.

use async_trait::async_trait;

use crate::cid::DataStream;
use crate::error::Result;
use crate::message::Message;
use crate::message::MessagesFilter;
use crate::message::MessageType;
use crate::message::ProtocolDefinition;
use crate::message::ProtocolsQueryFilter;
use crate::message::RecordsFilter;
use crate::message::RecordsWriteOptions;
use crate::reply::MessageReply;

/// Typed construction parameters, one variant per constructor.
#[derive(Clone, Debug)]
pub enum MessageParams {
  /// Parameters of a `RecordsWrite`.
  RecordsWrite(Box<RecordsWriteOptions>),
  /// Filter of a `RecordsRead`.
  RecordsRead(RecordsFilter),
  /// Filter of a `RecordsQuery`.
  RecordsQuery(RecordsFilter),
  /// Target of a `RecordsDelete`.
  RecordsDelete {
    /// The record to delete.
    record_id: String,
    /// Also delete descendants.
    prune: Option<bool>,
  },
  /// Filter of a `RecordsSubscribe`.
  RecordsSubscribe(RecordsFilter),
  /// Definition installed by a `ProtocolsConfigure`.
  ProtocolsConfigure(ProtocolDefinition),
  /// Filter of a `ProtocolsQuery`.
  ProtocolsQuery(Option<ProtocolsQueryFilter>),
  /// CIDs fetched by a `MessagesGet`.
  MessagesGet(Vec<String>),
  /// Filters of a `MessagesQuery`.
  MessagesQuery(Vec<MessagesFilter>),
  /// Filters of a `MessagesSubscribe`.
  MessagesSubscribe(Vec<MessagesFilter>),
}

impl MessageParams {
  /// The message type these parameters construct.
  pub fn message_type(&self) -> MessageType {
    match self {
      Self::RecordsWrite(_) => MessageType::RECORDS_WRITE,
      Self::RecordsRead(_) => MessageType::RECORDS_READ,
      Self::RecordsQuery(_) => MessageType::RECORDS_QUERY,
      Self::RecordsDelete { .. } => MessageType::RECORDS_DELETE,
      Self::RecordsSubscribe(_) => MessageType::RECORDS_SUBSCRIBE,
      Self::ProtocolsConfigure(_) => MessageType::PROTOCOLS_CONFIGURE,
      Self::ProtocolsQuery(_) => MessageType::PROTOCOLS_QUERY,
      Self::MessagesGet(_) => MessageType::MESSAGES_GET,
      Self::MessagesQuery(_) => MessageType::MESSAGES_QUERY,
      Self::MessagesSubscribe(_) => MessageType::MESSAGES_SUBSCRIBE,
    }
  }
}

/// The message source of a request: construction parameters, or a raw
/// message to parse and re-dispatch.
#[derive(Clone, Debug)]
pub enum MessageInput {
  /// Construct from typed parameters.
  Params(MessageParams),
  /// Parse the given raw message.
  Raw(serde_json::Value),
}

/// A request to the DWN pipeline.
#[derive(Clone, Debug)]
pub struct DwnRequest {
  /// The DID authoring (signing) the message.
  pub author: String,
  /// The tenant whose DWN partition is addressed.
  pub target: String,
  /// The message to build or parse.
  pub input: MessageInput,
  /// Record data accompanying a `RecordsWrite`.
  pub data_stream: Option<DataStream>,
  /// When `false`, the message is constructed and signed but not handed to
  /// the DWN; the reply is a synthesized `202 Accepted`.
  pub store: bool,
  /// Additionally sign as the target tenant's owner; `RecordsWrite` only.
  pub sign_as_owner: bool,
}

impl DwnRequest {
  /// A request constructing a message from `params`, authored and targeted
  /// as given.
  pub fn new(author: impl Into<String>, target: impl Into<String>, params: MessageParams) -> Self {
    Self {
      author: author.into(),
      target: target.into(),
      input: MessageInput::Params(params),
      data_stream: None,
      store: true,
      sign_as_owner: false,
    }
  }

  /// Attaches a data stream.
  pub fn with_data_stream(mut self, data_stream: DataStream) -> Self {
    self.data_stream = Some(data_stream);
    self
  }

  /// Disables handing the message to the DWN.
  pub fn without_store(mut self) -> Self {
    self.store = false;
    self
  }

  /// Requests an additional owner signature.
  pub fn with_owner_signature(mut self) -> Self {
    self.sign_as_owner = true;
    self
  }
}

/// The result of a processed request: the DWN reply, the constructed
/// message, and its CID.
#[derive(Clone, Debug)]
pub struct DwnMessageReply {
  /// The reply from the DWN (or the synthesized `202`).
  pub reply: MessageReply,
  /// The signed message.
  pub message: Message,
  /// The message CID.
  pub message_cid: String,
}

/// The capability to run DWN requests through the agent pipeline, locally
/// or against a remote peer.
#[async_trait]
pub trait DwnExecutor: Send + Sync {
  /// Builds, signs and processes `request` against the local DWN.
  async fn process_dwn_request(&self, request: DwnRequest) -> Result<DwnMessageReply>;

  /// Builds, signs and sends `request` to the target's remote DWN.
  async fn send_dwn_request(&self, request: DwnRequest) -> Result<DwnMessageReply>;
}
