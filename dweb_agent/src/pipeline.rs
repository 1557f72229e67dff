// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DWN request pipeline: build a message, attach the right signer,
//! compute its CID and hand it to the local DWN or a remote peer.
//!
//! The pipeline is the one [`DwnExecutor`] in the process; the permissions
//! API and record stores reach the DWN exclusively through it, so every
//! outgoing message carries a signature from the correct author key.

use core::fmt::Debug;
use core::fmt::Formatter;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::AbortRegistration;
use futures::future::Abortable;
use parking_lot::RwLock;

use dweb_crypto::CryptoAlg;
use dweb_crypto::KeyManager;
use dweb_crypto::KeyManagerSigner;
use dweb_crypto::KeyStorageErrorKind;
use dweb_crypto::KeyUri;
use dweb_did::BearerDid;
use dweb_did::Document;
use dweb_did::Resolver;
use dweb_did::VerificationMethod;
use dweb_dwn::DataStream;
use dweb_dwn::DwnExecutor;
use dweb_dwn::DwnMessageReply;
use dweb_dwn::DwnNode;
use dweb_dwn::DwnRequest;
use dweb_dwn::DwnServerRpc;
use dweb_dwn::Message;
use dweb_dwn::MessageInput;
use dweb_dwn::MessageParams;
use dweb_dwn::MessageReply;
use dweb_dwn::MessagesGetMessage;
use dweb_dwn::MessagesQueryMessage;
use dweb_dwn::MessagesSubscribeMessage;
use dweb_dwn::ProtocolsConfigureMessage;
use dweb_dwn::ProtocolsQueryMessage;
use dweb_dwn::RecordsDeleteMessage;
use dweb_dwn::RecordsQueryMessage;
use dweb_dwn::RecordsReadMessage;
use dweb_dwn::RecordsSubscribeMessage;
use dweb_dwn::RecordsWriteMessage;
use dweb_dwn::Status;
use dweb_jose::Jwk;

/// The DWN service type looked up in a target's DID document for remote
/// sends.
pub const DWN_SERVICE_TYPE: &str = "DecentralizedWebNode";

/// The request pipeline.
pub struct DwnApi {
  key_manager: Arc<dyn KeyManager>,
  resolver: Arc<Resolver>,
  node: Arc<dyn DwnNode>,
  rpc: Arc<dyn DwnServerRpc>,
  // Set by the facade once the vault is unlocked.
  agent: RwLock<Option<BearerDid>>,
}

impl DwnApi {
  /// Creates the pipeline over its collaborators.
  pub fn new(
    key_manager: Arc<dyn KeyManager>,
    resolver: Arc<Resolver>,
    node: Arc<dyn DwnNode>,
    rpc: Arc<dyn DwnServerRpc>,
  ) -> Self {
    Self {
      key_manager,
      resolver,
      node,
      rpc,
      agent: RwLock::new(None),
    }
  }

  /// Binds the unlocked agent DID; its signer is used directly whenever it
  /// authors a message.
  pub fn set_agent(&self, agent: BearerDid) {
    *self.agent.write() = Some(agent);
  }

  /// Unbinds the agent DID when the vault locks.
  pub fn clear_agent(&self) {
    *self.agent.write() = None;
  }

  /// The currently bound agent DID.
  pub fn agent(&self) -> Option<BearerDid> {
    self.agent.read().clone()
  }

  /// Runs `request` against the local DWN, aborting at the given
  /// registration. Aborted requests fail with
  /// [`Cancelled`](dweb_dwn::Error::Cancelled) and commit nothing.
  pub async fn process_cancellable(
    &self,
    request: DwnRequest,
    abort: AbortRegistration,
  ) -> dweb_dwn::Result<DwnMessageReply> {
    match Abortable::new(self.process(request), abort).await {
      Ok(result) => result,
      Err(futures::future::Aborted) => Err(dweb_dwn::Error::Cancelled),
    }
  }

  async fn process(&self, mut request: DwnRequest) -> dweb_dwn::Result<DwnMessageReply> {
    // The data CID must exist before the stream is handed to the DWN for
    // consumption; a fork keeps the processing copy untouched.
    attach_data_cid(&mut request)?;

    let signer: KeyManagerSigner = self.resolve_signer(&request.author).await?;
    let message: Message = build_message(&request, &signer).await?;
    let message_cid: String = message.compute_cid()?;

    tracing::debug!(
      author = %request.author,
      target = %request.target,
      message_type = %message.message_type(),
      store = request.store,
      "processing DWN request"
    );

    let reply: MessageReply = if request.store {
      self
        .node
        .process_message(&request.target, message.clone(), request.data_stream.as_ref().map(DataStream::fork))
        .await?
    } else {
      MessageReply::from_status(Status::accepted())
    };

    Ok(DwnMessageReply {
      reply,
      message,
      message_cid,
    })
  }

  async fn send(&self, mut request: DwnRequest) -> dweb_dwn::Result<DwnMessageReply> {
    attach_data_cid(&mut request)?;

    let signer: KeyManagerSigner = self.resolve_signer(&request.author).await?;
    let message: Message = build_message(&request, &signer).await?;
    let message_cid: String = message.compute_cid()?;

    let endpoint: String = self.dwn_endpoint(&request.target).await?;

    tracing::debug!(
      author = %request.author,
      target = %request.target,
      %endpoint,
      message_type = %message.message_type(),
      "sending DWN request"
    );

    let reply: MessageReply = self
      .rpc
      .send(&endpoint, &request.target, message.clone(), request.data_stream.as_ref().map(DataStream::fork))
      .await?;

    Ok(DwnMessageReply {
      reply,
      message,
      message_cid,
    })
  }

  /// Resolves a signer for `author`: the agent-vault signer when the agent
  /// itself authors, otherwise the author's default signing method backed
  /// by the key manager.
  async fn resolve_signer(&self, author: &str) -> dweb_dwn::Result<KeyManagerSigner> {
    if let Some(agent) = self.agent() {
      if agent.uri.to_string() == author {
        return agent.get_signer(None).await.map_err(|err| map_signer_error(err, author));
      }
    }

    let resolution = self.resolver.resolve(author).await;
    let document: Document = match (resolution.did_resolution_metadata.error, resolution.did_document) {
      (None, Some(document)) => document,
      (error, _) => {
        return Err(dweb_dwn::Error::UnresolvableAuthor {
          did: author.to_owned(),
          reason: error
            .map(|error| error.to_string())
            .unwrap_or_else(|| "no document".to_owned()),
        })
      }
    };

    let method: VerificationMethod = self
      .signing_method(author, &document)
      .map_err(|err| map_signer_error(err, author))?;
    let public: &Jwk = method.public_key_jwk.as_ref().ok_or_else(|| dweb_dwn::Error::UnresolvableAuthor {
      did: author.to_owned(),
      reason: "signing method carries no public key".to_owned(),
    })?;

    let key_uri: KeyUri = KeyUri::from_jwk(public).map_err(dweb_crypto::KeyStorageError::from)?;
    if !self.key_manager.exists(&key_uri).await? {
      return Err(dweb_dwn::Error::KeyNotInKeyManager(author.to_owned()));
    }

    let algorithm: &str = CryptoAlg::from_jwk(public)
      .map_err(dweb_crypto::KeyStorageError::from)?
      .jws_name();
    let kid: String = if method.id.starts_with('#') {
      format!("{author}{}", method.id)
    } else {
      method.id.clone()
    };

    Ok(KeyManagerSigner::new(Arc::clone(&self.key_manager), key_uri, algorithm.to_owned(), kid))
  }

  fn signing_method(&self, author: &str, document: &Document) -> dweb_did::Result<VerificationMethod> {
    // Prefer the method back-end's selection rule when one is registered.
    let uri: dweb_did::DidUri = dweb_did::DidUri::parse(author)?;
    match self.resolver.method(uri.method()) {
      Some(backend) => backend.get_signing_method(document),
      None => document
        .default_signing_method()
        .cloned()
        .ok_or(dweb_did::Error::InvalidDocument("document declares no verification methods")),
    }
  }

  /// Looks up the `DecentralizedWebNode` service endpoint of `target`.
  async fn dwn_endpoint(&self, target: &str) -> dweb_dwn::Result<String> {
    let resolution = self.resolver.resolve(target).await;
    let document: Document = resolution.did_document.ok_or_else(|| dweb_dwn::Error::Transport {
      message: format!("`{target}` did not resolve to a document"),
      source: None,
    })?;

    document
      .service
      .iter()
      .find(|service| service.type_ == DWN_SERVICE_TYPE)
      .and_then(|service| first_endpoint(&service.service_endpoint))
      .ok_or_else(|| dweb_dwn::Error::Transport {
        message: format!("`{target}` declares no {DWN_SERVICE_TYPE} service endpoint"),
        source: None,
      })
  }
}

#[async_trait]
impl DwnExecutor for DwnApi {
  async fn process_dwn_request(&self, request: DwnRequest) -> dweb_dwn::Result<DwnMessageReply> {
    self.process(request).await
  }

  async fn send_dwn_request(&self, request: DwnRequest) -> dweb_dwn::Result<DwnMessageReply> {
    self.send(request).await
  }
}

impl Debug for DwnApi {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("DwnApi").finish()
  }
}

/// Computes `dataCid`/`dataSize` from the request's data stream before the
/// stream is consumed anywhere else.
fn attach_data_cid(request: &mut DwnRequest) -> dweb_dwn::Result<()> {
  let Some(data_stream) = &request.data_stream else {
    return Ok(());
  };
  let MessageInput::Params(MessageParams::RecordsWrite(options)) = &mut request.input else {
    return Ok(());
  };
  if options.data.is_some() || options.data_cid.is_some() {
    return Ok(());
  }

  let fork: DataStream = data_stream.fork();
  options.data_cid = Some(fork.compute_cid());
  options.data_size = Some(fork.len());

  Ok(())
}

async fn build_message(request: &DwnRequest, signer: &KeyManagerSigner) -> dweb_dwn::Result<Message> {
  let mut message: Message = match &request.input {
    MessageInput::Raw(raw) => Message::parse(raw.clone())?,
    MessageInput::Params(params) => match params.clone() {
      MessageParams::RecordsWrite(options) => Message::RecordsWrite(RecordsWriteMessage::create(*options, signer).await?),
      MessageParams::RecordsRead(filter) => Message::RecordsRead(RecordsReadMessage::create(filter, signer).await?),
      MessageParams::RecordsQuery(filter) => Message::RecordsQuery(RecordsQueryMessage::create(filter, signer).await?),
      MessageParams::RecordsDelete { record_id, prune } => {
        Message::RecordsDelete(RecordsDeleteMessage::create(record_id, prune, signer).await?)
      }
      MessageParams::RecordsSubscribe(filter) => {
        Message::RecordsSubscribe(RecordsSubscribeMessage::create(filter, signer).await?)
      }
      MessageParams::ProtocolsConfigure(definition) => {
        Message::ProtocolsConfigure(ProtocolsConfigureMessage::create(definition, signer).await?)
      }
      MessageParams::ProtocolsQuery(filter) => {
        Message::ProtocolsQuery(ProtocolsQueryMessage::create(filter, signer).await?)
      }
      MessageParams::MessagesGet(cids) => Message::MessagesGet(MessagesGetMessage::create(cids, signer).await?),
      MessageParams::MessagesQuery(filters) => {
        Message::MessagesQuery(MessagesQueryMessage::create(filters, signer).await?)
      }
      MessageParams::MessagesSubscribe(filters) => {
        Message::MessagesSubscribe(MessagesSubscribeMessage::create(filters, signer).await?)
      }
    },
  };

  if request.sign_as_owner {
    match &mut message {
      Message::RecordsWrite(write) => write.sign_as_owner(signer).await?,
      other => {
        return Err(dweb_dwn::Error::InvalidMessage(format!(
          "`signAsOwner` applies to RecordsWrite, not {}",
          other.message_type()
        )))
      }
    }
  }

  Ok(message)
}

fn map_signer_error(error: dweb_did::Error, author: &str) -> dweb_dwn::Error {
  match error {
    dweb_did::Error::KeyStorage(err) if matches!(err.kind(), KeyStorageErrorKind::KeyNotFound) => {
      dweb_dwn::Error::KeyNotInKeyManager(author.to_owned())
    }
    dweb_did::Error::KeyStorage(err) => dweb_dwn::Error::KeyStorage(err),
    other => dweb_dwn::Error::UnresolvableAuthor {
      did: author.to_owned(),
      reason: other.to_string(),
    },
  }
}

fn first_endpoint(endpoint: &serde_json::Value) -> Option<String> {
  match endpoint {
    serde_json::Value::String(url) => Some(url.clone()),
    serde_json::Value::Array(entries) => entries.iter().find_map(|entry| entry.as_str().map(str::to_owned)),
    _ => None,
  }
}
