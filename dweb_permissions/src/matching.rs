// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The grant matching predicate.

use dweb_dwn::MessageType;

use crate::grant::PermissionGrant;
use crate::scope::PermissionScope;

/// The lookup criteria a candidate grant is matched against.
#[derive(Clone, Debug)]
pub struct GrantQuery<'a> {
  /// The DID that must have issued the grant.
  pub grantor: &'a str,
  /// The DID that must hold the grant.
  pub grantee: &'a str,
  /// The message type of the intended operation.
  pub message_type: MessageType,
  /// Protocol of the intended operation.
  pub protocol: Option<&'a str>,
  /// Protocol path of the intended operation; Records only.
  pub protocol_path: Option<&'a str>,
  /// Context id of the intended operation; Records only.
  pub context_id: Option<&'a str>,
  /// Require a delegated grant.
  pub delegated: bool,
}

/// Returns the first grant in `grants` whose scope covers `query`.
///
/// Iteration order is the order the underlying query returned the grants;
/// ties are broken by first match. Expiry is *not* consulted here; callers
/// decide how to treat an expired match.
pub fn find_matching_grant<'g>(grants: &'g [PermissionGrant], query: &GrantQuery<'_>) -> Option<&'g PermissionGrant> {
  grants.iter().find(|grant| grant_matches(grant, query))
}

fn grant_matches(grant: &PermissionGrant, query: &GrantQuery<'_>) -> bool {
  if grant.grantor != query.grantor || grant.grantee != query.grantee {
    return false;
  }
  if query.delegated && grant.data.delegated != Some(true) {
    return false;
  }

  let scope: &PermissionScope = &grant.data.scope;
  if scope.message_type() != query.message_type {
    return false;
  }

  if query.message_type.is_records() {
    records_scope_matches(scope, query)
  } else {
    // Messages and Protocols scopes only ever narrow by protocol; an
    // absent scope protocol matches any request.
    match &scope.protocol {
      None => true,
      Some(protocol) => query.protocol == Some(protocol.as_str()),
    }
  }
}

fn records_scope_matches(scope: &PermissionScope, query: &GrantQuery<'_>) -> bool {
  if scope.protocol.as_deref() != query.protocol {
    return false;
  }

  match (&scope.protocol_path, &scope.context_id) {
    // Unrestricted: any record under the protocol.
    (None, None) => true,
    (Some(path), None) => query.protocol_path == Some(path.as_str()),
    (None, Some(context)) => query
      .context_id
      .is_some_and(|candidate| candidate.starts_with(context.as_str())),
    // Both set never validates; such a grant matches nothing.
    (Some(_), Some(_)) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grant::GrantData;
  use crate::test_utils::grant_with_scope;

  fn query<'a>(message_type: MessageType) -> GrantQuery<'a> {
    GrantQuery {
      grantor: "did:example:alice",
      grantee: "did:example:bob",
      message_type,
      protocol: None,
      protocol_path: None,
      context_id: None,
      delegated: false,
    }
  }

  fn records_scope(protocol: &str) -> PermissionScope {
    PermissionScope::new(MessageType::RECORDS_WRITE).with_protocol(protocol)
  }

  #[tokio::test]
  async fn unrestricted_records_scope_matches_any_path() {
    let grant: PermissionGrant = grant_with_scope("did:example:alice", "did:example:bob", records_scope("P")).await;
    let grants: Vec<PermissionGrant> = vec![grant];

    let mut lookup: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    lookup.protocol = Some("P");
    lookup.protocol_path = Some("P/msg");

    assert!(find_matching_grant(&grants, &lookup).is_some());
  }

  #[tokio::test]
  async fn protocol_path_scope_is_exact() {
    let grant: PermissionGrant = grant_with_scope(
      "did:example:alice",
      "did:example:bob",
      records_scope("P").with_protocol_path("P/root"),
    )
    .await;
    let grants: Vec<PermissionGrant> = vec![grant];

    let mut matching: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    matching.protocol = Some("P");
    matching.protocol_path = Some("P/root");
    assert!(find_matching_grant(&grants, &matching).is_some());

    let mut other: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    other.protocol = Some("P");
    other.protocol_path = Some("P/other");
    assert!(find_matching_grant(&grants, &other).is_none());
  }

  #[tokio::test]
  async fn context_id_scope_is_a_prefix_match() {
    let grant: PermissionGrant = grant_with_scope(
      "did:example:alice",
      "did:example:bob",
      records_scope("P").with_context_id("root-ctx"),
    )
    .await;
    let grants: Vec<PermissionGrant> = vec![grant];

    let mut inside: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    inside.protocol = Some("P");
    inside.context_id = Some("root-ctx/child-1");
    assert!(find_matching_grant(&grants, &inside).is_some());

    let mut outside: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    outside.protocol = Some("P");
    outside.context_id = Some("other-ctx/child-1");
    assert!(find_matching_grant(&grants, &outside).is_none());
  }

  #[tokio::test]
  async fn parties_message_type_and_delegation_must_line_up() {
    let grant: PermissionGrant = grant_with_scope("did:example:alice", "did:example:bob", records_scope("P")).await;
    let grants: Vec<PermissionGrant> = vec![grant];

    // Wrong grantee.
    let mut wrong_grantee: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    wrong_grantee.grantee = "did:example:mallory";
    wrong_grantee.protocol = Some("P");
    assert!(find_matching_grant(&grants, &wrong_grantee).is_none());

    // Wrong message type.
    let mut wrong_type: GrantQuery<'_> = query(MessageType::RECORDS_DELETE);
    wrong_type.protocol = Some("P");
    assert!(find_matching_grant(&grants, &wrong_type).is_none());

    // Delegation requested, but the grant is not delegated.
    let mut delegated: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    delegated.protocol = Some("P");
    delegated.delegated = true;
    assert!(find_matching_grant(&grants, &delegated).is_none());
  }

  #[tokio::test]
  async fn messages_scope_without_protocol_matches_everything() {
    let grant: PermissionGrant = grant_with_scope(
      "did:example:alice",
      "did:example:bob",
      PermissionScope::new(MessageType::MESSAGES_QUERY),
    )
    .await;
    let grants: Vec<PermissionGrant> = vec![grant];

    let mut with_protocol: GrantQuery<'_> = query(MessageType::MESSAGES_QUERY);
    with_protocol.protocol = Some("P");
    assert!(find_matching_grant(&grants, &with_protocol).is_some());

    let without_protocol: GrantQuery<'_> = query(MessageType::MESSAGES_QUERY);
    assert!(find_matching_grant(&grants, &without_protocol).is_some());
  }

  #[tokio::test]
  async fn first_match_wins() {
    let first: PermissionGrant = grant_with_scope("did:example:alice", "did:example:bob", records_scope("P")).await;
    let second: PermissionGrant = grant_with_scope("did:example:alice", "did:example:bob", records_scope("P")).await;
    let first_id: String = first.id.clone();
    let grants: Vec<PermissionGrant> = vec![first, second];

    let mut lookup: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    lookup.protocol = Some("P");
    assert_eq!(find_matching_grant(&grants, &lookup).unwrap().id, first_id);
  }

  #[tokio::test]
  async fn expiry_is_not_consulted_by_the_matcher() {
    let mut grant: PermissionGrant = grant_with_scope("did:example:alice", "did:example:bob", records_scope("P")).await;
    grant.data = GrantData {
      date_expires: "2000-01-01T00:00:00.000000Z".to_owned(),
      ..grant.data
    };
    assert!(grant.is_expired(chrono::Utc::now()));

    let grants: Vec<PermissionGrant> = vec![grant];
    let mut lookup: GrantQuery<'_> = query(MessageType::RECORDS_WRITE);
    lookup.protocol = Some("P");
    assert!(find_matching_grant(&grants, &lookup).is_some());
  }
}
