// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The TTL cache over resolved permission grants.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::num::NonZeroUsize;
use std::time::Duration;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;

use dweb_dwn::MessageType;

use crate::grant::PermissionGrant;

/// Default time-to-live of cached grant lookups.
pub const DEFAULT_GRANT_TTL: Duration = Duration::from_secs(60);

const CACHE_CAPACITY: usize = 256;

struct CacheEntry {
  grant: PermissionGrant,
  expires_at: Instant,
}

/// Caches successful grant lookups per
/// `grantor ~ grantee ~ messageType ~ protocol`.
///
/// Only positive outcomes enter the cache; a failed lookup is never
/// negatively cached and always re-queries.
pub struct GrantCache {
  cache: Mutex<LruCache<String, CacheEntry>>,
  ttl: Duration,
}

impl GrantCache {
  /// Creates a cache with the given time-to-live.
  pub fn new(ttl: Duration) -> Self {
    Self {
      cache: Mutex::new(LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).expect("capacity is non-zero"))),
      ttl,
    }
  }

  /// The composite cache key of a lookup.
  pub fn key(grantor: &str, grantee: &str, message_type: MessageType, protocol: Option<&str>) -> String {
    format!("{grantor}~{grantee}~{message_type}~{}", protocol.unwrap_or("-"))
  }

  /// Returns the cached grant for `key` if it has not expired.
  pub fn get(&self, key: &str) -> Option<PermissionGrant> {
    let mut cache = self.cache.lock();
    match cache.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => Some(entry.grant.clone()),
      Some(_) => {
        cache.pop(key);
        None
      }
      None => None,
    }
  }

  /// Caches `grant` under `key`.
  pub fn insert(&self, key: String, grant: PermissionGrant) {
    self.cache.lock().put(
      key,
      CacheEntry {
        grant,
        expires_at: Instant::now() + self.ttl,
      },
    );
  }

  /// Drops every cached entry.
  pub fn clear(&self) {
    self.cache.lock().clear();
  }
}

impl Default for GrantCache {
  fn default() -> Self {
    Self::new(DEFAULT_GRANT_TTL)
  }
}

impl Debug for GrantCache {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("GrantCache").field("ttl", &self.ttl).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scope::PermissionScope;
  use crate::test_utils::grant_with_scope;

  #[tokio::test]
  async fn entries_expire_after_the_ttl() {
    let cache: GrantCache = GrantCache::new(Duration::from_millis(0));
    let grant: PermissionGrant = grant_with_scope(
      "did:example:alice",
      "did:example:bob",
      PermissionScope::new(MessageType::RECORDS_WRITE).with_protocol("P"),
    )
    .await;

    let key: String = GrantCache::key("did:example:alice", "did:example:bob", MessageType::RECORDS_WRITE, Some("P"));
    cache.insert(key.clone(), grant);
    assert!(cache.get(&key).is_none());
  }

  #[tokio::test]
  async fn clear_drops_everything() {
    let cache: GrantCache = GrantCache::default();
    let grant: PermissionGrant = grant_with_scope(
      "did:example:alice",
      "did:example:bob",
      PermissionScope::new(MessageType::RECORDS_WRITE).with_protocol("P"),
    )
    .await;

    let key: String = GrantCache::key("did:example:alice", "did:example:bob", MessageType::RECORDS_WRITE, Some("P"));
    cache.insert(key.clone(), grant);
    assert!(cache.get(&key).is_some());

    cache.clear();
    assert!(cache.get(&key).is_none());
  }
}
