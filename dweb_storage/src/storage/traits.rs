// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use core::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;

#[cfg(not(feature = "send-sync-storage"))]
mod storage_sub_trait {
  pub trait StorageSendSyncMaybe {}
  impl<S: super::KeyValueStore> StorageSendSyncMaybe for S {}
}

#[cfg(feature = "send-sync-storage")]
mod storage_sub_trait {
  pub trait StorageSendSyncMaybe: Send + Sync {}
  impl<S: Send + Sync + super::KeyValueStore> StorageSendSyncMaybe for S {}
}

/// A flat, async key-value store backing every persisted agent record: the
/// sealed vault blob, per-tenant key material, and identity records.
///
/// Keys are `/`-separated strings whose first segment is the owning tenant,
/// which is what makes tenant partitioning enforceable with a plain prefix
/// scan. Values are opaque bytes, JSON in practice.
#[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
#[cfg_attr(feature = "send-sync-storage", async_trait)]
pub trait KeyValueStore: storage_sub_trait::StorageSendSyncMaybe + Debug {
  /// Retrieves the value stored under `key`.
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Stores `value` under `key`, overwriting any previous value.
  async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

  /// Deletes the value under `key`.
  ///
  /// This operation is idempotent: the return value signals whether a value
  /// was actually removed.
  async fn delete(&self, key: &str) -> Result<bool>;

  /// Lists all keys starting with `prefix`, in lexicographic order.
  async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

  /// Removes every stored value.
  async fn clear(&self) -> Result<()>;
}
