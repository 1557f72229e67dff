// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The permissions API: grant/request/revocation CRUD, lookup with
//! caching, and revocation checks.
//!
//! The API holds a [`DwnExecutor`] capability instead of an agent
//! reference; every record operation flows through the same request
//! pipeline as ordinary messages and is therefore signed with the correct
//! author key.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use dweb_dwn::DwnExecutor;
use dweb_dwn::DwnMessageReply;
use dweb_dwn::DwnRequest;
use dweb_dwn::Message;
use dweb_dwn::MessageInput;
use dweb_dwn::MessageParams;
use dweb_dwn::MessageType;
use dweb_dwn::RecordsFilter;
use dweb_dwn::RecordsWriteMessage;
use dweb_dwn::RecordsWriteOptions;
use dweb_dwn::ReplyEntry;
use dweb_dwn::Tags;

use crate::cache::GrantCache;
use crate::error::Error;
use crate::error::Result;
use crate::grant::GrantData;
use crate::grant::PermissionGrant;
use crate::grant::PermissionRequest;
use crate::grant::RequestData;
use crate::grant::RevocationData;
use crate::grant::GRANT_PATH;
use crate::grant::PERMISSIONS_PROTOCOL;
use crate::grant::REQUEST_PATH;
use crate::grant::REVOCATION_PATH;
use crate::matching::find_matching_grant;
use crate::matching::GrantQuery;
use crate::scope::PermissionScope;

/// Parameters of [`PermissionsApi::create_grant`].
#[derive(Clone, Debug)]
pub struct CreateGrantOptions {
  /// The issuing DID; authors and stores the grant.
  pub grantor: String,
  /// The empowered DID.
  pub grantee: String,
  /// What the grant permits.
  pub scope: PermissionScope,
  /// Expiry timestamp (RFC 3339).
  pub date_expires: String,
  /// Issue a delegated grant.
  pub delegated: Option<bool>,
  /// Id of the request record being answered.
  pub request_id: Option<String>,
  /// Human-readable reason.
  pub description: Option<String>,
  /// Hand the record to the DWN; `false` constructs and signs only.
  pub store: bool,
}

impl CreateGrantOptions {
  /// Grant `scope` from `grantor` to `grantee` until `date_expires`.
  pub fn new(
    grantor: impl Into<String>,
    grantee: impl Into<String>,
    scope: PermissionScope,
    date_expires: impl Into<String>,
  ) -> Self {
    Self {
      grantor: grantor.into(),
      grantee: grantee.into(),
      scope,
      date_expires: date_expires.into(),
      delegated: None,
      request_id: None,
      description: None,
      store: true,
    }
  }
}

/// The lookup criteria of [`PermissionsApi::get_permission_for_request`].
#[derive(Clone, Debug)]
pub struct PermissionLookup {
  /// The DID that must have issued the grant.
  pub grantor: String,
  /// The DID acting under the grant; its local DWN holds received grants.
  pub grantee: String,
  /// Message type of the intended operation.
  pub message_type: MessageType,
  /// Protocol of the intended operation.
  pub protocol: Option<String>,
  /// Protocol path of the intended operation.
  pub protocol_path: Option<String>,
  /// Context id of the intended operation.
  pub context_id: Option<String>,
  /// Require a delegated grant.
  pub delegated: bool,
  /// Consult the TTL cache before querying the DWN.
  pub cached: bool,
}

impl PermissionLookup {
  /// A non-delegated, cached lookup for `message_type`.
  pub fn new(grantor: impl Into<String>, grantee: impl Into<String>, message_type: MessageType) -> Self {
    Self {
      grantor: grantor.into(),
      grantee: grantee.into(),
      message_type,
      protocol: None,
      protocol_path: None,
      context_id: None,
      delegated: false,
      cached: true,
    }
  }
}

/// Grant/request/revocation management over a DWN.
pub struct PermissionsApi<E> {
  executor: Arc<E>,
  cache: GrantCache,
}

impl<E: DwnExecutor> PermissionsApi<E> {
  /// Creates the API over `executor` with the default grant cache.
  pub fn new(executor: Arc<E>) -> Self {
    Self {
      executor,
      cache: GrantCache::default(),
    }
  }

  /// Creates the API with an explicit grant-cache TTL.
  pub fn with_cache_ttl(executor: Arc<E>, ttl: Duration) -> Self {
    Self {
      executor,
      cache: GrantCache::new(ttl),
    }
  }

  /// Drops all cached grant lookups.
  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  /// Issues a permission grant as a signed record in the grantor's DWN
  /// and delivers a copy of it to the grantee's DWN partition.
  ///
  /// Grant lookups run against the *grantee's* partition (that is where
  /// [`get_permission_for_request`](Self::get_permission_for_request)
  /// queries), while the grantor's partition is the canonical home of the
  /// record and of its revocation children. The record is immutable and
  /// signed, so the copy is the very same message replayed against the
  /// second tenant; without it a grant would be invisible to its holder
  /// on any DWN that partitions storage by tenant.
  pub async fn create_grant(&self, options: CreateGrantOptions) -> Result<PermissionGrant> {
    options.scope.validate()?;

    let data: GrantData = GrantData {
      date_expires: options.date_expires,
      delegated: options.delegated,
      request_id: options.request_id,
      description: options.description,
      scope: options.scope,
    };

    let write: RecordsWriteOptions = permission_record_options(
      GRANT_PATH,
      serde_json::to_vec(&data)?,
      Some(options.grantee.clone()),
      None,
      data.scope.protocol.as_deref(),
    );

    let mut request: DwnRequest = DwnRequest::new(
      options.grantor.clone(),
      options.grantor.clone(),
      MessageParams::RecordsWrite(Box::new(write)),
    );
    request.store = options.store;

    let reply: DwnMessageReply = self.executor.process_dwn_request(request).await?;
    let grant: PermissionGrant = PermissionGrant::try_from_message(expect_records_write(reply.message)?)?;

    if options.store {
      self.deliver_grant(&grant).await?;
    }

    Ok(grant)
  }

  /// Replays the signed grant record into the grantee's partition, where
  /// the grantee's own lookups will find it.
  async fn deliver_grant(&self, grant: &PermissionGrant) -> Result<()> {
    let raw: serde_json::Value = serde_json::to_value(Message::RecordsWrite(grant.message.clone()))?;
    let delivery: DwnRequest = DwnRequest {
      author: grant.grantor.clone(),
      target: grant.grantee.clone(),
      input: MessageInput::Raw(raw),
      data_stream: None,
      store: true,
      sign_as_owner: false,
    };

    let reply: DwnMessageReply = self.executor.process_dwn_request(delivery).await?;
    if !reply.reply.status.is_success() {
      return Err(Error::GrantDeliveryFailed(format!(
        "grantee copy answered {}: {}",
        reply.reply.status.code, reply.reply.status.detail
      )));
    }

    tracing::debug!(grant = %grant.id, grantee = %grant.grantee, "grant delivered");

    Ok(())
  }

  /// Files a permission request in the requester's DWN, ready to be sent
  /// to the prospective grantor.
  pub async fn create_request(
    &self,
    requester: &str,
    scope: PermissionScope,
    delegated: Option<bool>,
    store: bool,
  ) -> Result<PermissionRequest> {
    scope.validate()?;

    let data: RequestData = RequestData {
      delegated,
      description: None,
      scope,
    };

    let write: RecordsWriteOptions = permission_record_options(
      REQUEST_PATH,
      serde_json::to_vec(&data)?,
      None,
      None,
      data.scope.protocol.as_deref(),
    );

    let mut request: DwnRequest = DwnRequest::new(requester, requester, MessageParams::RecordsWrite(Box::new(write)));
    request.store = store;

    let reply: DwnMessageReply = self.executor.process_dwn_request(request).await?;
    PermissionRequest::try_from_message(expect_records_write(reply.message)?)
  }

  /// Revokes `grant` with a child revocation record. With `remote` the
  /// revocation is sent to the grantor's remote DWN instead of being
  /// stored locally.
  pub async fn create_revocation(&self, grant: &PermissionGrant, remote: bool) -> Result<()> {
    let data: RevocationData = RevocationData { description: None };

    let write: RecordsWriteOptions = permission_record_options(
      REVOCATION_PATH,
      serde_json::to_vec(&data)?,
      None,
      grant.message.context_id.clone(),
      grant.data.scope.protocol.as_deref(),
    );

    let request: DwnRequest = DwnRequest::new(
      grant.grantor.clone(),
      grant.grantor.clone(),
      MessageParams::RecordsWrite(Box::new(write)),
    );

    let reply: DwnMessageReply = if remote {
      self.executor.send_dwn_request(request).await?
    } else {
      self.executor.process_dwn_request(request).await?
    };

    if !reply.reply.status.is_success() {
      return Err(Error::PermissionsLookupFailed(format!(
        "revocation write answered {}: {}",
        reply.reply.status.code, reply.reply.status.detail
      )));
    }

    tracing::debug!(grant = %grant.id, remote, "grant revoked");

    Ok(())
  }

  /// Lists the grants stored in `tenant`'s DWN.
  pub async fn fetch_grants(&self, author: &str, tenant: &str) -> Result<Vec<PermissionGrant>> {
    let filter: RecordsFilter = RecordsFilter {
      protocol: Some(PERMISSIONS_PROTOCOL.to_owned()),
      protocol_path: Some(GRANT_PATH.to_owned()),
      ..RecordsFilter::default()
    };

    let request: DwnRequest = DwnRequest::new(author, tenant, MessageParams::RecordsQuery(filter));
    let reply: DwnMessageReply = self.executor.process_dwn_request(request).await?;

    let entries: Vec<ReplyEntry> = reply.reply.entries.unwrap_or_default();
    let mut grants: Vec<PermissionGrant> = Vec::with_capacity(entries.len());
    for entry in entries {
      // Tolerate foreign records under the grant path.
      if let Ok(message) = entry_to_records_write(entry) {
        if let Ok(grant) = PermissionGrant::try_from_message(message) {
          grants.push(grant);
        }
      }
    }

    Ok(grants)
  }

  /// Checks whether `grant` has been revoked, by reading the revocation
  /// child record from the grantor's local (or, with `remote`, remote)
  /// DWN.
  ///
  /// Status `200` means revoked, `404` means not revoked; anything else is
  /// a lookup failure.
  pub async fn is_grant_revoked(&self, author: &str, target: &str, grant_id: &str, remote: bool) -> Result<bool> {
    let filter: RecordsFilter = RecordsFilter {
      protocol: Some(PERMISSIONS_PROTOCOL.to_owned()),
      protocol_path: Some(REVOCATION_PATH.to_owned()),
      parent_id: Some(grant_id.to_owned()),
      ..RecordsFilter::default()
    };

    let request: DwnRequest = DwnRequest::new(author, target, MessageParams::RecordsRead(filter));
    let reply: DwnMessageReply = if remote {
      self.executor.send_dwn_request(request).await?
    } else {
      self.executor.process_dwn_request(request).await?
    };

    match reply.reply.status.code {
      200 => Ok(true),
      404 => Ok(false),
      code => Err(Error::PermissionsLookupFailed(format!(
        "revocation read answered {code}: {}",
        reply.reply.status.detail
      ))),
    }
  }

  /// Finds the grant authorizing the described operation.
  ///
  /// Queries the *grantee's* partition, where
  /// [`create_grant`](Self::create_grant) delivered the holder's copy of
  /// every issued grant. Consults the TTL cache first when `lookup.cached`
  /// is set; a fresh query observes every stored grant. Fails with
  /// [`Error::NoMatchingGrant`] when nothing matches and
  /// [`Error::GrantExpired`] when the first match has expired.
  pub async fn get_permission_for_request(&self, lookup: &PermissionLookup) -> Result<PermissionGrant> {
    let key: String = GrantCache::key(
      &lookup.grantor,
      &lookup.grantee,
      lookup.message_type,
      lookup.protocol.as_deref(),
    );

    if lookup.cached {
      if let Some(grant) = self.cache.get(&key) {
        tracing::trace!(%key, "grant cache hit");
        return Ok(grant);
      }
    }

    let grants: Vec<PermissionGrant> = self.fetch_grants(&lookup.grantee, &lookup.grantee).await?;
    let query: GrantQuery<'_> = GrantQuery {
      grantor: &lookup.grantor,
      grantee: &lookup.grantee,
      message_type: lookup.message_type,
      protocol: lookup.protocol.as_deref(),
      protocol_path: lookup.protocol_path.as_deref(),
      context_id: lookup.context_id.as_deref(),
      delegated: lookup.delegated,
    };

    let grant: &PermissionGrant = find_matching_grant(&grants, &query).ok_or(Error::NoMatchingGrant)?;
    if grant.is_expired(Utc::now()) {
      return Err(Error::GrantExpired);
    }

    let grant: PermissionGrant = grant.clone();
    self.cache.insert(key, grant.clone());

    Ok(grant)
  }
}

fn permission_record_options(
  protocol_path: &str,
  data: Vec<u8>,
  recipient: Option<String>,
  parent_context_id: Option<String>,
  scope_protocol: Option<&str>,
) -> RecordsWriteOptions {
  // `tags.protocol` mirrors the scoped protocol for indexed lookups.
  let tags: Option<Tags> = scope_protocol.map(|protocol| {
    let mut tags: Tags = Tags::new();
    tags.insert("protocol".to_owned(), serde_json::Value::String(protocol.to_owned()));
    tags
  });

  RecordsWriteOptions {
    data_format: "application/json".to_owned(),
    data: Some(data),
    protocol: Some(PERMISSIONS_PROTOCOL.to_owned()),
    protocol_path: Some(protocol_path.to_owned()),
    recipient,
    parent_context_id,
    tags,
    ..RecordsWriteOptions::default()
  }
}

fn expect_records_write(message: Message) -> Result<RecordsWriteMessage> {
  match message {
    Message::RecordsWrite(message) => Ok(message),
    other => Err(Error::InvalidGrant(format!(
      "expected a RecordsWrite, got {}",
      other.message_type()
    ))),
  }
}

fn entry_to_records_write(entry: ReplyEntry) -> Result<RecordsWriteMessage> {
  let mut value: serde_json::Value = entry.message;
  if let (Some(object), Some(encoded_data)) = (value.as_object_mut(), entry.encoded_data) {
    object.insert("encodedData".to_owned(), serde_json::Value::String(encoded_data));
  }
  Ok(RecordsWriteMessage::parse(value)?)
}
