// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use core::fmt::Debug;
use core::fmt::Formatter;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use async_trait::async_trait;

use crate::error::Error;
use crate::error::Result;
use crate::storage::KeyValueStore;

type Records = BTreeMap<String, Vec<u8>>;

/// An in-memory [`KeyValueStore`] used in tests and for ephemeral agents.
///
/// The ordered map gives `list_keys` a stable lexicographic order, which
/// downstream record queries rely on. A poisoned lock surfaces as a crate
/// error rather than a panic, so one crashed task cannot take the whole
/// store down silently.
pub struct MemStore {
  records: RwLock<Records>,
}

impl MemStore {
  /// Creates a new, empty `MemStore` instance.
  pub fn new() -> Self {
    Self {
      records: RwLock::new(BTreeMap::new()),
    }
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, Records>> {
    self.records.read().map_err(|_| Error::SharedReadPoisoned)
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Records>> {
    self.records.write().map_err(|_| Error::SharedWritePoisoned)
  }
}

#[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
#[cfg_attr(feature = "send-sync-storage", async_trait)]
impl KeyValueStore for MemStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.read()?.get(key).cloned())
  }

  async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
    self.write()?.insert(key.to_owned(), value);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<bool> {
    Ok(self.write()?.remove(key).is_some())
  }

  async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
    let records: RwLockReadGuard<'_, Records> = self.read()?;
    Ok(
      records
        .range(prefix.to_owned()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .map(|(key, _)| key.clone())
        .collect(),
    )
  }

  async fn clear(&self) -> Result<()> {
    self.write()?.clear();
    Ok(())
  }
}

impl Debug for MemStore {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str("MemStore")
  }
}

impl Default for MemStore {
  fn default() -> Self {
    Self::new()
  }
}
