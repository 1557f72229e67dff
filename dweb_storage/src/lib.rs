// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Storage layer of the DWN agent: the passphrase-sealed identity vault,
//! the local content-addressed key manager, and per-tenant identity
//! records, all over a pluggable key-value store.

pub mod error;
pub mod identity_store;
pub mod key_manager;
pub mod storage;
pub mod utils;
pub mod vault;

pub use error::Error;
pub use error::Result;
pub use identity_store::Identity;
pub use identity_store::IdentityMetadata;
pub use identity_store::IdentityStore;
pub use key_manager::LocalKeyManager;
pub use storage::KeyValueStore;
pub use storage::MemStore;
pub use vault::Vault;
pub use vault::VaultBackup;
pub use vault::VaultStatus;
