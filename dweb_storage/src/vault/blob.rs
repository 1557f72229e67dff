// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The persisted, sealed representation of the vault.

use serde::Deserialize;
use serde::Serialize;

/// Parameters of the passphrase KDF.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultKdfParams {
  /// KDF algorithm identifier.
  pub algorithm: String,
  /// base64url-encoded random salt.
  pub salt: String,
  /// Iteration count; configurable so tests can keep unlocking cheap.
  pub work_factor: usize,
}

/// Parameters of the authenticated cipher sealing the seed.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultCipherParams {
  /// Cipher algorithm identifier.
  pub algorithm: String,
  /// base64url-encoded nonce.
  pub nonce: String,
}

/// The sealed vault content: everything needed to re-derive the KEK and
/// authenticate the seed, plus the public agent DID derived from it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultBlob {
  /// Blob layout version.
  pub version: u32,
  /// KDF parameters.
  pub kdf: VaultKdfParams,
  /// Cipher parameters.
  pub cipher: VaultCipherParams,
  /// base64url-encoded sealed seed.
  pub ciphertext: String,
  /// base64url-encoded authentication tag.
  pub tag: String,
  /// The DID derived from the seed's identity key.
  pub agent_did_uri: String,
}

impl VaultBlob {
  /// Current blob layout version.
  pub const VERSION: u32 = 1;
  /// KDF algorithm identifier written into new blobs.
  pub const KDF_ALGORITHM: &'static str = "PBKDF2-HMAC-SHA512";
  /// Cipher algorithm identifier written into new blobs.
  pub const CIPHER_ALGORITHM: &'static str = "AES-256-GCM";
}

/// The full persisted vault record: the blob plus local bookkeeping.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
  /// The sealed blob.
  pub blob: VaultBlob,
  /// Timestamp of the most recent backup.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_backup: Option<String>,
  /// Timestamp of the most recent restore.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_restore: Option<String>,
}

/// A portable vault backup.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultBackup {
  /// Creation timestamp.
  pub date_created: String,
  /// Size of `data` in bytes.
  pub size: usize,
  /// base64url-encoded [`VaultBlob`], version tag included.
  pub data: String,
}

/// The observable vault lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatus {
  /// Whether a sealed seed exists.
  pub initialized: bool,
  /// Whether the seed is currently inaccessible.
  pub locked: bool,
  /// Timestamp of the most recent backup.
  pub last_backup: Option<String>,
  /// Timestamp of the most recent restore.
  pub last_restore: Option<String>,
}
