// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The method-pluggable, caching DID resolver.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::num::NonZeroUsize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;

use crate::did::DidUri;
use crate::method::DidMethod;
use crate::resolution::ResolutionError;
use crate::resolution::ResolutionResult;

/// Default time-to-live of cached resolutions.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Default capacity of the resolution cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

struct CacheEntry {
  result: ResolutionResult,
  expires_at: Instant,
}

/// Resolves DIDs by dispatching to registered [`DidMethod`] back-ends,
/// memoizing successful resolutions with a TTL.
///
/// Results whose resolution metadata carries an error are never cached.
pub struct Resolver {
  methods: HashMap<&'static str, Arc<dyn DidMethod>>,
  cache: Mutex<LruCache<String, CacheEntry>>,
  ttl: Duration,
}

impl Resolver {
  /// Creates an empty resolver with the default cache configuration.
  pub fn new() -> Self {
    Self::with_ttl(DEFAULT_CACHE_TTL)
  }

  /// Creates an empty resolver caching successful resolutions for `ttl`.
  pub fn with_ttl(ttl: Duration) -> Self {
    Self {
      methods: HashMap::new(),
      cache: Mutex::new(LruCache::new(
        NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).expect("capacity is non-zero"),
      )),
      ttl,
    }
  }

  /// Registers a method back-end under its name, replacing any previous
  /// registration.
  pub fn register(&mut self, method: Arc<dyn DidMethod>) -> &mut Self {
    self.methods.insert(method.name(), method);
    self
  }

  /// Returns the back-end registered for `name`.
  pub fn method(&self, name: &str) -> Option<&Arc<dyn DidMethod>> {
    self.methods.get(name)
  }

  /// Resolves `did`, consulting the cache first.
  ///
  /// Never fails: parse errors and unregistered methods are reported inside
  /// the result's resolution metadata.
  pub async fn resolve(&self, did: &str) -> ResolutionResult {
    let uri: DidUri = match DidUri::parse(did) {
      Ok(uri) => uri,
      Err(_) => return ResolutionResult::from_error(ResolutionError::InvalidDid),
    };

    let Some(method) = self.methods.get(uri.method()) else {
      return ResolutionResult::from_error(ResolutionError::MethodNotSupported);
    };

    let cache_key: String = uri.to_did().to_string();
    if let Some(cached) = self.cache_get(&cache_key) {
      tracing::trace!(did = %cache_key, "resolution cache hit");
      return cached;
    }

    let result: ResolutionResult = method.resolve(did).await;

    if result.did_resolution_metadata.error.is_none() {
      self.cache.lock().put(
        cache_key,
        CacheEntry {
          result: result.clone(),
          expires_at: Instant::now() + self.ttl,
        },
      );
    }

    result
  }

  /// Drops every cached resolution.
  pub fn clear_cache(&self) {
    self.cache.lock().clear();
  }

  fn cache_get(&self, key: &str) -> Option<ResolutionResult> {
    let mut cache = self.cache.lock();
    match cache.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => Some(entry.result.clone()),
      Some(_) => {
        cache.pop(key);
        None
      }
      None => None,
    }
  }
}

impl Default for Resolver {
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for Resolver {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Resolver")
      .field("methods", &self.methods.keys().collect::<Vec<_>>())
      .field("ttl", &self.ttl)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use core::sync::atomic::AtomicUsize;
  use core::sync::atomic::Ordering;

  use async_trait::async_trait;

  use super::*;
  use crate::document::Document;

  /// Counts back-end invocations and fails every resolution for ids
  /// starting with `missing`.
  #[derive(Debug, Default)]
  struct CountingMethod {
    calls: AtomicUsize,
  }

  #[async_trait]
  impl DidMethod for CountingMethod {
    fn name(&self) -> &'static str {
      "count"
    }

    async fn create(
      &self,
      _key_manager: &std::sync::Arc<dyn dweb_crypto::KeyManager>,
      _options: crate::method::CreateOptions,
    ) -> crate::error::Result<crate::bearer::BearerDid> {
      unimplemented!("not exercised")
    }

    async fn resolve(&self, did: &str) -> ResolutionResult {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if did.contains("missing") {
        ResolutionResult::from_error(ResolutionError::NotFound)
      } else {
        ResolutionResult::from_document(Document::new(did))
      }
    }
  }

  fn resolver_with(method: Arc<CountingMethod>) -> Resolver {
    let mut resolver: Resolver = Resolver::new();
    resolver.register(method);
    resolver
  }

  #[tokio::test]
  async fn successful_resolutions_are_cached() {
    let method: Arc<CountingMethod> = Arc::new(CountingMethod::default());
    let resolver: Resolver = resolver_with(Arc::clone(&method));

    assert!(resolver.resolve("did:count:alice").await.is_success());
    assert!(resolver.resolve("did:count:alice").await.is_success());
    assert_eq!(method.calls.load(Ordering::SeqCst), 1);

    resolver.clear_cache();
    assert!(resolver.resolve("did:count:alice").await.is_success());
    assert_eq!(method.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn error_results_are_never_cached() {
    let method: Arc<CountingMethod> = Arc::new(CountingMethod::default());
    let resolver: Resolver = resolver_with(Arc::clone(&method));

    for _ in 0..3 {
      let result: ResolutionResult = resolver.resolve("did:count:missing").await;
      assert_eq!(result.did_resolution_metadata.error, Some(ResolutionError::NotFound));
    }
    assert_eq!(method.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn expired_entries_are_refreshed() {
    let method: Arc<CountingMethod> = Arc::new(CountingMethod::default());
    let mut resolver: Resolver = Resolver::with_ttl(Duration::from_millis(0));
    resolver.register(Arc::clone(&method) as Arc<dyn DidMethod>);

    assert!(resolver.resolve("did:count:alice").await.is_success());
    assert!(resolver.resolve("did:count:alice").await.is_success());
    assert_eq!(method.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn unparseable_and_unregistered_inputs() {
    let resolver: Resolver = Resolver::new();

    let invalid: ResolutionResult = resolver.resolve("not-a-did").await;
    assert_eq!(invalid.did_resolution_metadata.error, Some(ResolutionError::InvalidDid));

    let unregistered: ResolutionResult = resolver.resolve("did:absent:123").await;
    assert_eq!(
      unregistered.did_resolution_metadata.error,
      Some(ResolutionError::MethodNotSupported)
    );
  }
}
