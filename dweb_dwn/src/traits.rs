// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Contracts toward the external DWN engine and remote DWN servers.

use core::fmt::Debug;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::cid::DataStream;
use crate::error::Error;
use crate::error::Result;
use crate::message::Message;
use crate::reply::MessageReply;

/// The external DWN engine: stores messages, enforces protocol rules, and
/// answers queries. The agent only ever calls `process_message`.
#[async_trait]
pub trait DwnNode: Send + Sync + Debug {
  /// Processes `message` against the `target` tenant's partition.
  async fn process_message(&self, target: &str, message: Message, data: Option<DataStream>) -> Result<MessageReply>;
}

/// A client for invoking `processMessage` on a remote DWN server.
#[async_trait]
pub trait DwnServerRpc: Send + Sync + Debug {
  /// Sends `message` to the DWN server at `url`, addressed to `target`.
  ///
  /// Transport failures surface as [`Error::Transport`]; retrying is the
  /// caller's policy.
  async fn send(&self, url: &str, target: &str, message: Message, data: Option<DataStream>) -> Result<MessageReply>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RpcParams {
  target: String,
  message: Message,
  #[serde(skip_serializing_if = "Option::is_none")]
  encoded_data: Option<String>,
}

#[derive(Serialize)]
struct RpcRequest {
  jsonrpc: &'static str,
  id: u64,
  method: &'static str,
  params: RpcParams,
}

#[derive(Deserialize)]
struct RpcResponse {
  #[serde(default)]
  result: Option<RpcResult>,
  #[serde(default)]
  error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcResult {
  reply: MessageReply,
}

#[derive(Deserialize)]
struct RpcError {
  code: i64,
  message: String,
}

/// JSON-RPC 2.0 `dwn.processMessage` over HTTPS.
#[derive(Debug, Default)]
pub struct HttpDwnRpc {
  client: reqwest::Client,
  next_id: AtomicU64,
}

impl HttpDwnRpc {
  /// The JSON-RPC method name.
  const METHOD: &'static str = "dwn.processMessage";

  /// Creates a client with default HTTP settings.
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl DwnServerRpc for HttpDwnRpc {
  async fn send(&self, url: &str, target: &str, message: Message, data: Option<DataStream>) -> Result<MessageReply> {
    let request: RpcRequest = RpcRequest {
      jsonrpc: "2.0",
      id: self.next_id.fetch_add(1, Ordering::Relaxed),
      method: Self::METHOD,
      params: RpcParams {
        target: target.to_owned(),
        message,
        encoded_data: data.map(|data| dweb_jose::jwu::encode_b64(data.as_slice())),
      },
    };

    tracing::debug!(%url, %target, "dispatching dwn.processMessage");

    let response = self
      .client
      .post(url)
      .json(&request)
      .send()
      .await
      .map_err(|err| Error::transport(format!("request to `{url}` failed"), err))?;

    let status: reqwest::StatusCode = response.status();
    if !status.is_success() {
      return Err(Error::Transport {
        message: format!("`{url}` answered HTTP {status}"),
        source: None,
      });
    }

    let body: RpcResponse = response
      .json()
      .await
      .map_err(|err| Error::transport(format!("`{url}` returned a malformed JSON-RPC response"), err))?;

    if let Some(error) = body.error {
      return Err(Error::Transport {
        message: format!("`{url}` answered JSON-RPC error {}: {}", error.code, error.message),
        source: None,
      });
    }

    body
      .result
      .map(|result| result.reply)
      .ok_or_else(|| Error::Transport {
        message: format!("`{url}` answered without result or error"),
        source: None,
      })
  }
}
