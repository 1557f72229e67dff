// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! End-to-end permission flows against a scripted DWN executor.
//!
//! The executor partitions storage by target tenant, like a real DWN: a
//! record written to Alice's partition is invisible to queries against
//! Bob's. Grant delivery and revocation visibility are exercised across
//! partitions.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use dweb_crypto::registry;
use dweb_crypto::CryptoAlg;
use dweb_crypto::KeyManagerResult;
use dweb_crypto::Signer;
use dweb_dwn::DwnExecutor;
use dweb_dwn::DwnMessageReply;
use dweb_dwn::DwnRequest;
use dweb_dwn::Message;
use dweb_dwn::MessageInput;
use dweb_dwn::MessageParams;
use dweb_dwn::MessageReply;
use dweb_dwn::MessageType;
use dweb_dwn::RecordsFilter;
use dweb_dwn::RecordsWriteMessage;
use dweb_dwn::ReplyEntry;
use dweb_dwn::Status;
use dweb_jose::Jwk;
use dweb_permissions::CreateGrantOptions;
use dweb_permissions::Error;
use dweb_permissions::PermissionLookup;
use dweb_permissions::PermissionsApi;
use dweb_permissions::PermissionScope;

const ALICE: &str = "did:example:alice";
const BOB: &str = "did:example:bob";
const CAROL: &str = "did:example:carol";

struct AuthorSigner {
  key: Jwk,
  kid: String,
}

#[async_trait]
impl Signer for AuthorSigner {
  fn algorithm(&self) -> &str {
    "EdDSA"
  }

  fn key_id(&self) -> &str {
    &self.kid
  }

  async fn sign(&self, data: &[u8]) -> KeyManagerResult<Vec<u8>> {
    Ok(registry::sign(&self.key, data)?)
  }
}

// Records stored per target tenant.
type Partitions = Mutex<HashMap<String, Vec<RecordsWriteMessage>>>;

/// A DWN double with per-tenant partitions, a local and a remote side, and
/// per-author test keys.
#[derive(Default)]
struct MockDwn {
  keys: Mutex<HashMap<String, Jwk>>,
  local: Partitions,
  remote: Partitions,
  query_count: AtomicUsize,
}

impl MockDwn {
  fn signer_for(&self, author: &str) -> AuthorSigner {
    let mut keys = self.keys.lock().unwrap();
    let key: Jwk = keys
      .entry(author.to_owned())
      .or_insert_with(|| registry::generate_key(CryptoAlg::Ed25519).unwrap())
      .clone();
    AuthorSigner {
      key,
      kid: format!("{author}#0"),
    }
  }

  fn store_write(partitions: &Partitions, target: &str, message: RecordsWriteMessage) {
    partitions.lock().unwrap().entry(target.to_owned()).or_default().push(message);
  }

  fn partition_len(&self, target: &str) -> usize {
    self.local.lock().unwrap().get(target).map_or(0, Vec::len)
  }

  async fn execute(&self, request: DwnRequest, remote: bool) -> dweb_dwn::Result<DwnMessageReply> {
    let partitions: &Partitions = if remote { &self.remote } else { &self.local };

    let params: MessageParams = match request.input {
      MessageInput::Params(params) => params,
      MessageInput::Raw(raw) => {
        // Replayed records keep their original signature.
        let message: Message = Message::parse(raw)?;
        let Message::RecordsWrite(write) = message.clone() else {
          panic!("the permissions API only replays RecordsWrite records");
        };
        if request.store {
          Self::store_write(partitions, &request.target, write);
        }
        let message_cid: String = message.compute_cid()?;
        return Ok(DwnMessageReply {
          reply: MessageReply::from_status(Status::accepted()),
          message,
          message_cid,
        });
      }
    };

    match params {
      MessageParams::RecordsWrite(options) => {
        let signer: AuthorSigner = self.signer_for(&request.author);
        let message: RecordsWriteMessage = RecordsWriteMessage::create(*options, &signer).await?;
        if request.store {
          Self::store_write(partitions, &request.target, message.clone());
        }
        let message: Message = Message::RecordsWrite(message);
        let message_cid: String = message.compute_cid()?;
        Ok(DwnMessageReply {
          reply: MessageReply::from_status(Status::accepted()),
          message,
          message_cid,
        })
      }
      MessageParams::RecordsQuery(filter) => {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let entries: Vec<ReplyEntry> = self.matching_entries(partitions, &request.target, &filter);
        let signer: AuthorSigner = self.signer_for(&request.author);
        let message: Message = Message::RecordsQuery(dweb_dwn::RecordsQueryMessage::create(filter, &signer).await?);
        let message_cid: String = message.compute_cid()?;
        let mut reply: MessageReply = MessageReply::from_status(Status::ok());
        reply.entries = Some(entries);
        Ok(DwnMessageReply {
          reply,
          message,
          message_cid,
        })
      }
      MessageParams::RecordsRead(filter) => {
        let entries: Vec<ReplyEntry> = self.matching_entries(partitions, &request.target, &filter);
        let signer: AuthorSigner = self.signer_for(&request.author);
        let message: Message = Message::RecordsRead(dweb_dwn::RecordsReadMessage::create(filter, &signer).await?);
        let message_cid: String = message.compute_cid()?;
        let mut reply: MessageReply = if entries.is_empty() {
          MessageReply::from_status(Status::not_found())
        } else {
          MessageReply::from_status(Status::ok())
        };
        if !entries.is_empty() {
          reply.entries = Some(entries);
        }
        Ok(DwnMessageReply {
          reply,
          message,
          message_cid,
        })
      }
      other => panic!("unexpected message params: {:?}", other.message_type()),
    }
  }

  fn matching_entries(&self, partitions: &Partitions, target: &str, filter: &RecordsFilter) -> Vec<ReplyEntry> {
    partitions
      .lock()
      .unwrap()
      .get(target)
      .map(Vec::as_slice)
      .unwrap_or_default()
      .iter()
      .filter(|message| {
        filter
          .protocol
          .as_deref()
          .map_or(true, |protocol| message.descriptor.protocol.as_deref() == Some(protocol))
          && filter
            .protocol_path
            .as_deref()
            .map_or(true, |path| message.descriptor.protocol_path.as_deref() == Some(path))
          && filter
            .parent_id
            .as_deref()
            .map_or(true, |parent| message.descriptor.parent_id.as_deref() == Some(parent))
      })
      .map(|message| ReplyEntry {
        message: serde_json::to_value(message).unwrap(),
        encoded_data: None,
      })
      .collect()
  }
}

#[async_trait]
impl DwnExecutor for MockDwn {
  async fn process_dwn_request(&self, request: DwnRequest) -> dweb_dwn::Result<DwnMessageReply> {
    self.execute(request, false).await
  }

  async fn send_dwn_request(&self, request: DwnRequest) -> dweb_dwn::Result<DwnMessageReply> {
    self.execute(request, true).await
  }
}

fn api() -> (Arc<MockDwn>, PermissionsApi<MockDwn>) {
  let executor: Arc<MockDwn> = Arc::new(MockDwn::default());
  (Arc::clone(&executor), PermissionsApi::new(executor))
}

fn records_write_scope(protocol: &str) -> PermissionScope {
  PermissionScope::new(MessageType::RECORDS_WRITE).with_protocol(protocol)
}

#[tokio::test]
async fn grant_then_lookup_observes_the_grant() {
  let (_executor, api) = api();

  api
    .create_grant(CreateGrantOptions::new(
      ALICE,
      BOB,
      records_write_scope("P"),
      "2099-01-01T00:00:00.000000Z",
    ))
    .await
    .unwrap();

  // Unrestricted records scope matches any protocol path. The lookup runs
  // against Bob's own partition, so the delivered copy is what it finds.
  let mut lookup: PermissionLookup = PermissionLookup::new(ALICE, BOB, MessageType::RECORDS_WRITE);
  lookup.protocol = Some("P".to_owned());
  lookup.protocol_path = Some("P/msg".to_owned());
  lookup.cached = false;

  let grant = api.get_permission_for_request(&lookup).await.unwrap();
  assert_eq!(grant.grantor, ALICE);
  assert_eq!(grant.grantee, BOB);
}

#[tokio::test]
async fn grants_land_in_both_party_partitions() {
  let (executor, api) = api();

  let grant = api
    .create_grant(CreateGrantOptions::new(
      ALICE,
      BOB,
      records_write_scope("P"),
      "2099-01-01T00:00:00.000000Z",
    ))
    .await
    .unwrap();

  // Canonical record with the grantor, holder's copy with the grantee,
  // nobody else.
  assert_eq!(executor.partition_len(ALICE), 1);
  assert_eq!(executor.partition_len(BOB), 1);
  assert_eq!(executor.partition_len(CAROL), 0);

  // The copy is the same signed record, not a re-issued one.
  let bob_partition = executor.local.lock().unwrap();
  let copy: &RecordsWriteMessage = &bob_partition.get(BOB).unwrap()[0];
  assert_eq!(copy.record_id, grant.id);
  drop(bob_partition);

  // A bystander holds no copy, so the same lookup as Carol finds nothing.
  let mut as_carol: PermissionLookup = PermissionLookup::new(ALICE, CAROL, MessageType::RECORDS_WRITE);
  as_carol.protocol = Some("P".to_owned());
  as_carol.cached = false;
  assert!(matches!(
    api.get_permission_for_request(&as_carol).await,
    Err(Error::NoMatchingGrant)
  ));
}

#[tokio::test]
async fn unstored_grants_are_not_delivered() {
  let (executor, api) = api();

  let mut options: CreateGrantOptions =
    CreateGrantOptions::new(ALICE, BOB, records_write_scope("P"), "2099-01-01T00:00:00.000000Z");
  options.store = false;

  api.create_grant(options).await.unwrap();
  assert_eq!(executor.partition_len(ALICE), 0);
  assert_eq!(executor.partition_len(BOB), 0);
}

#[tokio::test]
async fn no_matching_grant_and_expired_grant_are_distinct() {
  let (_executor, api) = api();

  let mut lookup: PermissionLookup = PermissionLookup::new(ALICE, BOB, MessageType::RECORDS_WRITE);
  lookup.protocol = Some("P".to_owned());
  lookup.cached = false;
  assert!(matches!(
    api.get_permission_for_request(&lookup).await,
    Err(Error::NoMatchingGrant)
  ));

  api
    .create_grant(CreateGrantOptions::new(
      ALICE,
      BOB,
      records_write_scope("P"),
      "2000-01-01T00:00:00.000000Z",
    ))
    .await
    .unwrap();
  assert!(matches!(
    api.get_permission_for_request(&lookup).await,
    Err(Error::GrantExpired)
  ));
}

#[tokio::test]
async fn protocol_path_scope_rejects_other_paths() {
  let (_executor, api) = api();

  api
    .create_grant(CreateGrantOptions::new(
      ALICE,
      BOB,
      records_write_scope("P").with_protocol_path("P/root"),
      "2099-01-01T00:00:00.000000Z",
    ))
    .await
    .unwrap();

  let mut matching: PermissionLookup = PermissionLookup::new(ALICE, BOB, MessageType::RECORDS_WRITE);
  matching.protocol = Some("P".to_owned());
  matching.protocol_path = Some("P/root".to_owned());
  matching.cached = false;
  assert!(api.get_permission_for_request(&matching).await.is_ok());

  let mut other: PermissionLookup = matching.clone();
  other.protocol_path = Some("P/other".to_owned());
  assert!(matches!(
    api.get_permission_for_request(&other).await,
    Err(Error::NoMatchingGrant)
  ));
}

#[tokio::test]
async fn cached_lookups_skip_the_dwn() {
  let (executor, api) = api();

  api
    .create_grant(CreateGrantOptions::new(
      ALICE,
      BOB,
      records_write_scope("P"),
      "2099-01-01T00:00:00.000000Z",
    ))
    .await
    .unwrap();

  let mut lookup: PermissionLookup = PermissionLookup::new(ALICE, BOB, MessageType::RECORDS_WRITE);
  lookup.protocol = Some("P".to_owned());

  api.get_permission_for_request(&lookup).await.unwrap();
  api.get_permission_for_request(&lookup).await.unwrap();
  assert_eq!(executor.query_count.load(Ordering::SeqCst), 1);

  api.clear_cache();
  api.get_permission_for_request(&lookup).await.unwrap();
  assert_eq!(executor.query_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn revocation_is_visible_where_it_is_stored() {
  let (_executor, api) = api();

  let grant = api
    .create_grant(CreateGrantOptions::new(
      ALICE,
      BOB,
      records_write_scope("P"),
      "2099-01-01T00:00:00.000000Z",
    ))
    .await
    .unwrap();

  assert!(!api.is_grant_revoked(ALICE, ALICE, &grant.id, false).await.unwrap());

  // A revocation sent to the remote DWN is not visible locally.
  api.create_revocation(&grant, true).await.unwrap();
  assert!(!api.is_grant_revoked(ALICE, ALICE, &grant.id, false).await.unwrap());
  assert!(api.is_grant_revoked(ALICE, ALICE, &grant.id, true).await.unwrap());

  // Once stored locally, the local check flips too.
  api.create_revocation(&grant, false).await.unwrap();
  assert!(api.is_grant_revoked(ALICE, ALICE, &grant.id, false).await.unwrap());
}
