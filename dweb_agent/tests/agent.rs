// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! End-to-end agent scenarios: first launch, vault lifecycle, identity
//! management and the DWN request pipeline.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use dweb_agent::Agent;
use dweb_agent::AgentBuilder;
use dweb_agent::CreateIdentityOptions;
use dweb_agent::DidRequest;
use dweb_agent::DidResponse;
use dweb_crypto::KeyUri;
use dweb_did::BearerDid;
use dweb_did::CreateOptions;
use dweb_did::DidMethod;
use dweb_did::Document;
use dweb_did::PortableDid;
use dweb_did::ResolutionResult;
use dweb_did::Service;
use dweb_dwn::compute_data_cid;
use dweb_dwn::DataStream;
use dweb_dwn::DwnNode;
use dweb_dwn::DwnRequest;
use dweb_dwn::DwnServerRpc;
use dweb_dwn::Message;
use dweb_dwn::MessageParams;
use dweb_dwn::MessageReply;
use dweb_dwn::RecordsWriteOptions;
use dweb_dwn::Status;

const PASSPHRASE: &str = "dumbbell-krakatoa-ditty";
const RECOVERY_PHRASE: &str =
  "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

#[derive(Debug, Default)]
struct StubDwn {
  messages: Mutex<Vec<(String, Message, Option<Vec<u8>>)>>,
}

#[async_trait]
impl DwnNode for StubDwn {
  async fn process_message(
    &self,
    target: &str,
    message: Message,
    data: Option<DataStream>,
  ) -> dweb_dwn::Result<MessageReply> {
    self
      .messages
      .lock()
      .unwrap()
      .push((target.to_owned(), message, data.map(|data| data.as_slice().to_vec())));
    Ok(MessageReply::from_status(Status::accepted()))
  }
}

#[derive(Debug, Default)]
struct StubRpc {
  calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl DwnServerRpc for StubRpc {
  async fn send(
    &self,
    url: &str,
    target: &str,
    _message: Message,
    _data: Option<DataStream>,
  ) -> dweb_dwn::Result<MessageReply> {
    self.calls.lock().unwrap().push((url.to_owned(), target.to_owned()));
    Ok(MessageReply::from_status(Status::accepted()))
  }
}

/// A resolve-only method whose documents advertise a DWN service endpoint.
#[derive(Debug)]
struct EndpointMethod;

#[async_trait]
impl DidMethod for EndpointMethod {
  fn name(&self) -> &'static str {
    "endpoint"
  }

  async fn create(
    &self,
    _key_manager: &Arc<dyn dweb_crypto::KeyManager>,
    _options: CreateOptions,
  ) -> dweb_did::Result<BearerDid> {
    Err(dweb_did::Error::MethodNotSupported("endpoint (resolve-only)".to_owned()))
  }

  async fn resolve(&self, did: &str) -> ResolutionResult {
    let mut document: Document = Document::new(did);
    document.service.push(Service {
      id: format!("{did}#dwn"),
      type_: "DecentralizedWebNode".to_owned(),
      service_endpoint: serde_json::json!(["https://dwn.example.com"]),
    });
    ResolutionResult::from_document(document)
  }
}

struct TestHarness {
  agent: Agent,
  node: Arc<StubDwn>,
  rpc: Arc<StubRpc>,
}

fn harness() -> TestHarness {
  let node: Arc<StubDwn> = Arc::new(StubDwn::default());
  let rpc: Arc<StubRpc> = Arc::new(StubRpc::default());
  let agent: Agent = AgentBuilder::new()
    .dwn_node(Arc::clone(&node) as Arc<dyn DwnNode>)
    .rpc_client(Arc::clone(&rpc) as Arc<dyn DwnServerRpc>)
    .vault_work_factor(10)
    .register_method(Arc::new(EndpointMethod))
    .build()
    .unwrap();
  TestHarness { agent, node, rpc }
}

async fn started_agent() -> TestHarness {
  let harness: TestHarness = harness();
  harness.agent.initialize(PASSPHRASE, None).await.unwrap();
  harness.agent.start(PASSPHRASE).await.unwrap();
  harness
}

#[tokio::test]
async fn first_launch_initialize_start() {
  let TestHarness { agent, .. } = harness();

  assert!(agent.first_launch().await.unwrap());
  assert!(agent.agent_did().is_err());

  let mnemonic: String = agent.initialize(PASSPHRASE, None).await.unwrap();
  assert_eq!(mnemonic.split_whitespace().count(), 12);
  assert!(!agent.first_launch().await.unwrap());

  let status = agent.status().await.unwrap();
  assert!(status.initialized);
  assert!(!status.locked);
  assert!(status.last_backup.is_none());
  assert!(status.last_restore.is_none());

  agent.start(PASSPHRASE).await.unwrap();
  let did: BearerDid = agent.agent_did().unwrap();
  assert_eq!(did.uri.method(), "dht");

  agent.lock().unwrap();
  assert!(agent.agent_did().is_err());
  assert!(agent.status().await.unwrap().locked);
}

#[tokio::test]
async fn recovery_phrase_pins_the_agent_did() {
  let first: TestHarness = harness();
  let second: TestHarness = harness();

  first
    .agent
    .initialize(PASSPHRASE, Some(RECOVERY_PHRASE.to_owned()))
    .await
    .unwrap();
  second
    .agent
    .initialize("a-different-passphrase", Some(RECOVERY_PHRASE.to_owned()))
    .await
    .unwrap();

  first.agent.start(PASSPHRASE).await.unwrap();
  second.agent.start("a-different-passphrase").await.unwrap();

  assert_eq!(
    first.agent.agent_did().unwrap().uri,
    second.agent.agent_did().unwrap().uri
  );
}

#[tokio::test]
async fn wrong_passphrase_does_not_start() {
  let TestHarness { agent, .. } = harness();
  agent.initialize(PASSPHRASE, None).await.unwrap();
  agent.lock().unwrap();

  let err = agent.start("wrong").await.unwrap_err();
  assert!(matches!(
    err,
    dweb_agent::Error::Storage(dweb_storage::Error::IncorrectPassphrase)
  ));
  assert!(agent.agent_did().is_err());
}

#[tokio::test]
async fn identity_roundtrip_preserves_signing() {
  let exporter: TestHarness = started_agent().await;
  let importer: TestHarness = started_agent().await;

  let bearer: BearerDid = exporter
    .agent
    .create_identity(CreateIdentityOptions::new("jwk", "Social"))
    .await
    .unwrap();
  let uri: String = bearer.uri.to_string();

  let identities = exporter.agent.list_identities(&uri).await.unwrap();
  assert_eq!(identities.len(), 1);
  assert_eq!(identities[0].metadata.tenant, uri);
  // Identity records never carry private key material.
  assert!(identities[0]
    .did
    .verification_methods
    .iter()
    .all(|method| method.private_key_jwk.is_none()));

  // Export with keys, import into a fresh agent.
  let portable: PortableDid = exporter.agent.export_identity(&uri, &uri).await.unwrap();
  assert!(portable
    .verification_methods
    .iter()
    .all(|method| method.private_key_jwk.is_some()));

  let imported: BearerDid = importer.agent.import_identity(portable, "Social").await.unwrap();
  assert_eq!(imported.uri, bearer.uri);

  // Both handles sign equivalently.
  use dweb_crypto::Signer as _;
  let original_signer = bearer.get_signer(None).await.unwrap();
  let imported_signer = imported.get_signer(None).await.unwrap();

  let data: &[u8] = b"equivalence probe";
  let original_signature: Vec<u8> = original_signer.sign(data).await.unwrap();
  let public = imported
    .document
    .verification_method
    .first()
    .and_then(|method| method.public_key_jwk.clone())
    .unwrap();
  assert!(dweb_crypto::registry::verify(&public, &original_signature, data).unwrap());
  let imported_signature: Vec<u8> = imported_signer.sign(data).await.unwrap();
  assert!(dweb_crypto::registry::verify(&public, &imported_signature, data).unwrap());
}

#[tokio::test]
async fn did_requests_create_resolve_and_reject_the_rest() {
  let TestHarness { agent, .. } = started_agent().await;

  let DidResponse::Created(bearer) = agent
    .process_did_request(DidRequest::Create {
      method: "jwk".to_owned(),
      options: CreateOptions::default(),
    })
    .await
    .unwrap()
  else {
    panic!("expected a created DID");
  };

  let DidResponse::Resolved(resolution) = agent
    .process_did_request(DidRequest::Resolve {
      did: bearer.uri.to_string(),
    })
    .await
    .unwrap()
  else {
    panic!("expected a resolution result");
  };
  assert!(resolution.is_success());

  let err = agent
    .process_did_request(DidRequest::Update {
      did: bearer.uri.to_string(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, dweb_agent::Error::NotImplemented("DidUpdate")));
}

fn write_request(author: &str, target: &str) -> DwnRequest {
  DwnRequest::new(
    author,
    target,
    MessageParams::RecordsWrite(Box::new(RecordsWriteOptions {
      data_format: "application/octet-stream".to_owned(),
      ..RecordsWriteOptions::default()
    })),
  )
}

#[tokio::test]
async fn records_write_computes_the_data_cid_before_processing() {
  let TestHarness { agent, node, .. } = started_agent().await;
  let agent_did: String = agent.agent_did().unwrap().uri.to_string();

  let payload: &[u8] = b"hello dwn";
  let reply = agent
    .process_dwn_request(write_request(&agent_did, &agent_did).with_data_stream(DataStream::from_bytes(payload.to_vec())))
    .await
    .unwrap();

  assert_eq!(reply.reply.status, Status::accepted());
  assert!(reply.message_cid.starts_with('b'));

  let Message::RecordsWrite(write) = &reply.message else {
    panic!("expected a RecordsWrite");
  };
  // Invariant: the CID in the message equals an independent pass over the
  // stream.
  assert_eq!(write.descriptor.data_cid, compute_data_cid(payload));
  assert_eq!(write.descriptor.data_size, payload.len());

  // The processing copy of the stream arrived intact.
  let stored = node.messages.lock().unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].2.as_deref(), Some(payload));
}

#[tokio::test]
async fn store_false_synthesizes_an_accepted_reply() {
  let TestHarness { agent, node, .. } = started_agent().await;
  let agent_did: String = agent.agent_did().unwrap().uri.to_string();

  let reply = agent
    .process_dwn_request(
      write_request(&agent_did, &agent_did)
        .with_data_stream(DataStream::from_bytes(b"draft".to_vec()))
        .without_store(),
    )
    .await
    .unwrap();

  assert_eq!(reply.reply.status.code, 202);
  assert!(node.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sign_as_owner_attaches_the_owner_signature() {
  let TestHarness { agent, .. } = started_agent().await;
  let agent_did: String = agent.agent_did().unwrap().uri.to_string();

  let reply = agent
    .process_dwn_request(
      write_request(&agent_did, &agent_did)
        .with_data_stream(DataStream::from_bytes(b"owned".to_vec()))
        .with_owner_signature(),
    )
    .await
    .unwrap();

  let Message::RecordsWrite(write) = &reply.message else {
    panic!("expected a RecordsWrite");
  };
  assert!(write.authorization.as_ref().unwrap().owner_signature.is_some());
}

#[tokio::test]
async fn foreign_authors_require_their_key_in_the_key_manager() {
  let ours: TestHarness = started_agent().await;
  let theirs: TestHarness = started_agent().await;

  // A DID that resolves fine, but whose private key lives in another
  // agent's key manager.
  let foreign: BearerDid = theirs
    .agent
    .create_identity(CreateIdentityOptions::new("jwk", "Foreign"))
    .await
    .unwrap();
  let foreign_uri: String = foreign.uri.to_string();

  let err = ours
    .agent
    .process_dwn_request(
      write_request(&foreign_uri, &foreign_uri).with_data_stream(DataStream::from_bytes(b"x".to_vec())),
    )
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    dweb_agent::Error::Dwn(dweb_dwn::Error::KeyNotInKeyManager(_))
  ));
}

#[tokio::test]
async fn agent_key_survives_a_restart_of_the_same_store() {
  let TestHarness { agent, .. } = started_agent().await;
  let agent_did: BearerDid = agent.agent_did().unwrap();

  // The vault-derived identity key is resident in the key manager.
  let public = agent_did
    .document
    .verification_method
    .first()
    .and_then(|method| method.public_key_jwk.clone())
    .unwrap();
  let key_uri: KeyUri = KeyUri::from_jwk(&public).unwrap();
  assert!(agent.key_manager().exists(&key_uri).await.unwrap());

  // Starting again is idempotent with respect to the imported key.
  agent.lock().unwrap();
  agent.start(PASSPHRASE).await.unwrap();
  assert!(agent.key_manager().exists(&key_uri).await.unwrap());
}

#[tokio::test]
async fn cancelled_requests_commit_nothing() {
  let TestHarness { agent, node, .. } = started_agent().await;
  let agent_did: String = agent.agent_did().unwrap().uri.to_string();

  let (handle, registration) = futures::future::AbortHandle::new_pair();
  handle.abort();

  let err = agent
    .process_dwn_request_cancellable(
      write_request(&agent_did, &agent_did).with_data_stream(DataStream::from_bytes(b"never".to_vec())),
      registration,
    )
    .await
    .unwrap_err();

  assert!(err.is_cancelled());
  assert!(node.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn remote_sends_use_the_targets_service_endpoint() {
  let TestHarness { agent, rpc, .. } = started_agent().await;
  let agent_did: String = agent.agent_did().unwrap().uri.to_string();

  // Positive: the target advertises a DecentralizedWebNode endpoint.
  agent
    .send_dwn_request(
      write_request(&agent_did, "did:endpoint:peer").with_data_stream(DataStream::from_bytes(b"hi".to_vec())),
    )
    .await
    .unwrap();

  let calls = rpc.calls.lock().unwrap().clone();
  assert_eq!(calls, vec![("https://dwn.example.com".to_owned(), "did:endpoint:peer".to_owned())]);

  // Negative: a resolvable target without an endpoint is a transport error.
  let err = agent
    .send_dwn_request(
      write_request(&agent_did, &agent_did).with_data_stream(DataStream::from_bytes(b"hi".to_vec())),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, dweb_agent::Error::Dwn(dweb_dwn::Error::Transport { .. })));
}
