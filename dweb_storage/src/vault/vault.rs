// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The passphrase-sealed identity vault.
//!
//! The vault owns the agent's root seed: a BIP-39 derived secret sealed
//! with a passphrase-stretched key. Unlocking is the sole precondition for
//! signing as the agent; locking zeroizes the seed buffer.

use core::fmt::Debug;
use core::fmt::Formatter;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockWriteGuard;

use chrono::SecondsFormat;
use chrono::Utc;
use crypto::ciphers::aes::Aes256Gcm;
use crypto::ciphers::traits::Aead;
use crypto::keys::bip39;
use crypto::macs::hmac::HMAC_SHA512;
use zeroize::Zeroizing;

use dweb_crypto::registry;
use dweb_did::DidDht;
use dweb_jose::jwu;
use dweb_jose::Jwk;
use dweb_jose::JwkType;

use crate::error::Error;
use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::utils::derive_encryption_key;
use crate::utils::EncryptionKey;
use crate::vault::VaultBackup;
use crate::vault::VaultBlob;
use crate::vault::VaultCipherParams;
use crate::vault::VaultKdfParams;
use crate::vault::VaultRecord;
use crate::vault::VaultStatus;

// SLIP-10 master-node HMAC key for the Ed25519 curve.
const ED25519_SEED_KEY: &[u8] = b"ed25519 seed";

/// A seed sealed in memory; zeroized on drop and thus on `lock()`.
type UnlockedSeed = Option<Zeroizing<Vec<u8>>>;

/// The identity vault.
///
/// Lifecycle: uninitialized → initialized(unlocked) ⇄ initialized(locked).
/// There is no terminal state; a vault may be re-locked indefinitely.
pub struct Vault {
  store: Arc<dyn KeyValueStore>,
  // The single process-wide secret. Guarded directly; a poisoned lock maps
  // onto a crate error instead of propagating the panic.
  seed: RwLock<UnlockedSeed>,
  work_factor: usize,
}

impl Vault {
  /// Default PBKDF2 iteration count for newly sealed vaults.
  pub const DEFAULT_WORK_FACTOR: usize = 650_000;

  /// The store key of the persisted vault record.
  const RECORD_KEY: &'static str = "agent/vault";

  /// Creates a vault over `store` with the default work factor.
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self::with_work_factor(store, Self::DEFAULT_WORK_FACTOR)
  }

  /// Creates a vault with an explicit KDF work factor. Tests use a small
  /// value to keep unlocking cheap.
  pub fn with_work_factor(store: Arc<dyn KeyValueStore>, work_factor: usize) -> Self {
    Self {
      store,
      seed: RwLock::new(None),
      work_factor,
    }
  }

  fn seed_write(&self) -> Result<RwLockWriteGuard<'_, UnlockedSeed>> {
    self.seed.write().map_err(|_| Error::SharedWritePoisoned)
  }

  /// Returns `true` if no sealed seed exists yet.
  pub async fn is_initialized(&self) -> Result<bool> {
    Ok(self.read_record().await?.is_some())
  }

  /// Reports the vault lifecycle state.
  pub async fn status(&self) -> Result<VaultStatus> {
    let record: Option<VaultRecord> = self.read_record().await?;
    let locked: bool = self.seed.read().map_err(|_| Error::SharedReadPoisoned)?.is_none();

    Ok(match record {
      Some(record) => VaultStatus {
        initialized: true,
        locked,
        last_backup: record.last_backup,
        last_restore: record.last_restore,
      },
      None => VaultStatus {
        initialized: false,
        locked: true,
        last_backup: None,
        last_restore: None,
      },
    })
  }

  /// Initializes the vault: seals a seed derived from `recovery_phrase`
  /// (generating a fresh 12-word mnemonic when absent) under `passphrase`,
  /// derives and persists the agent DID, and leaves the vault unlocked.
  ///
  /// Returns the mnemonic backing the seed.
  pub async fn initialize(&self, passphrase: &str, recovery_phrase: Option<String>) -> Result<String> {
    if self.read_record().await?.is_some() {
      return Err(Error::AlreadyInitialized);
    }

    let mnemonic: String = match recovery_phrase {
      Some(phrase) => phrase,
      None => generate_mnemonic()?,
    };
    let seed: Zeroizing<Vec<u8>> = seed_from_mnemonic(&mnemonic);

    let blob: VaultBlob = seal_seed(passphrase, self.work_factor, &seed)?;
    let record: VaultRecord = VaultRecord {
      blob,
      last_backup: None,
      last_restore: None,
    };

    self.write_record(&record).await?;
    *self.seed_write()? = Some(seed);

    tracing::debug!(agent_did = %record.blob.agent_did_uri, "vault initialized");

    Ok(mnemonic)
  }

  /// Opens the sealed seed with `passphrase`. Idempotent when already
  /// unlocked with the same passphrase.
  pub async fn unlock(&self, passphrase: &str) -> Result<()> {
    let record: VaultRecord = self.require_record().await?;
    let seed: Zeroizing<Vec<u8>> = unseal_seed(&record.blob, passphrase)?;

    *self.seed_write()? = Some(seed);

    Ok(())
  }

  /// Zeroizes the in-memory seed. Idempotent.
  pub fn lock(&self) -> Result<()> {
    // Dropping the `Zeroizing` buffer wipes it.
    *self.seed_write()? = None;
    Ok(())
  }

  /// Re-seals the seed under `new_passphrase`, atomically swapping the
  /// persisted blob. On failure the prior sealed state is retained.
  pub async fn change_passphrase(&self, current_passphrase: &str, new_passphrase: &str) -> Result<bool> {
    let mut record: VaultRecord = self.require_record().await?;
    let seed: Zeroizing<Vec<u8>> = unseal_seed(&record.blob, current_passphrase)?;

    record.blob = seal_seed(new_passphrase, self.work_factor, &seed)?;
    self.write_record(&record).await?;
    *self.seed_write()? = Some(seed);

    Ok(true)
  }

  /// Exports the sealed blob. Works locked or unlocked; the backup is as
  /// opaque as the persisted state.
  pub async fn backup(&self) -> Result<VaultBackup> {
    let mut record: VaultRecord = self.require_record().await?;

    let data: String = jwu::encode_b64(serde_json::to_vec(&record.blob)?);
    let backup: VaultBackup = VaultBackup {
      date_created: timestamp(),
      size: data.len(),
      data,
    };

    record.last_backup = Some(backup.date_created.clone());
    self.write_record(&record).await?;

    Ok(backup)
  }

  /// Replaces the vault content with `backup` after verifying that
  /// `passphrase` opens it. On failure the prior state is retained.
  pub async fn restore(&self, backup: &VaultBackup, passphrase: &str) -> Result<()> {
    let blob: VaultBlob = jwu::decode_b64(backup.data.as_bytes())
      .ok()
      .and_then(|bytes| serde_json::from_slice(&bytes).ok())
      .ok_or(Error::InvalidBackup)?;

    let seed: Zeroizing<Vec<u8>> = unseal_seed(&blob, passphrase)?;

    let last_backup: Option<String> = self.read_record().await?.and_then(|record| record.last_backup);
    let record: VaultRecord = VaultRecord {
      blob,
      last_backup,
      last_restore: Some(timestamp()),
    };

    self.write_record(&record).await?;
    *self.seed_write()? = Some(seed);

    Ok(())
  }

  /// The DID derived from the sealed seed's identity key.
  pub async fn agent_did_uri(&self) -> Result<String> {
    Ok(self.require_record().await?.blob.agent_did_uri)
  }

  /// The agent's private identity JWK, re-derived from the unlocked seed.
  ///
  /// Fails with [`Error::VaultLocked`] while the vault is locked: the seed
  /// is the only source of this key.
  pub fn agent_identity_jwk(&self) -> Result<Jwk> {
    let guard = self.seed.read().map_err(|_| Error::SharedReadPoisoned)?;
    let seed: &Zeroizing<Vec<u8>> = guard.as_ref().ok_or(Error::VaultLocked)?;
    identity_jwk_from_seed(seed)
  }

  async fn read_record(&self) -> Result<Option<VaultRecord>> {
    match self.store.get(Self::RECORD_KEY).await? {
      Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  async fn require_record(&self) -> Result<VaultRecord> {
    self.read_record().await?.ok_or(Error::NotInitialized)
  }

  async fn write_record(&self, record: &VaultRecord) -> Result<()> {
    self.store.set(Self::RECORD_KEY, serde_json::to_vec(record)?).await
  }
}

impl Debug for Vault {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Vault").field("work_factor", &self.work_factor).finish()
  }
}

fn timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn generate_mnemonic() -> Result<String> {
  // 128 bits of entropy yields a 12-word mnemonic.
  let mut entropy: Zeroizing<[u8; 16]> = Zeroizing::new([0u8; 16]);
  crypto::utils::rand::fill(&mut *entropy).map_err(|err| Error::VaultCrypto(err.to_string()))?;

  bip39::wordlist::encode(&*entropy, &bip39::wordlist::ENGLISH)
    .map_err(|err| Error::VaultCrypto(format!("{err:?}")))
}

fn seed_from_mnemonic(mnemonic: &str) -> Zeroizing<Vec<u8>> {
  let mut seed: Zeroizing<[u8; 64]> = Zeroizing::new([0u8; 64]);
  bip39::mnemonic_to_seed(mnemonic, "", &mut seed);
  Zeroizing::new(seed.to_vec())
}

fn seal_seed(passphrase: &str, work_factor: usize, seed: &[u8]) -> Result<VaultBlob> {
  let mut salt: [u8; 16] = [0u8; 16];
  crypto::utils::rand::fill(&mut salt).map_err(|err| Error::VaultCrypto(err.to_string()))?;

  let key: EncryptionKey = derive_encryption_key(passphrase, &salt, work_factor)?;

  let nonce: &[u8] = &Aes256Gcm::random_nonce().map_err(|err| Error::VaultCrypto(err.to_string()))?;
  let padding: usize = Aes256Gcm::padsize(seed).map(|size| size.get()).unwrap_or_default();
  let mut ciphertext: Vec<u8> = vec![0; seed.len() + padding];
  let mut tag: Vec<u8> = [0; Aes256Gcm::TAG_LENGTH].to_vec();

  Aes256Gcm::try_encrypt(key.as_ref(), nonce, &[], seed, &mut ciphertext, &mut tag)
    .map_err(|err| Error::VaultCrypto(err.to_string()))?;

  let agent_did_uri: String = agent_did_from_seed(seed)?;

  Ok(VaultBlob {
    version: VaultBlob::VERSION,
    kdf: VaultKdfParams {
      algorithm: VaultBlob::KDF_ALGORITHM.to_owned(),
      salt: jwu::encode_b64(salt),
      work_factor,
    },
    cipher: VaultCipherParams {
      algorithm: VaultBlob::CIPHER_ALGORITHM.to_owned(),
      nonce: jwu::encode_b64(nonce),
    },
    ciphertext: jwu::encode_b64(&ciphertext),
    tag: jwu::encode_b64(&tag),
    agent_did_uri,
  })
}

/// Opens a sealed blob. Any failure along the way, a wrong passphrase and a
/// corrupted blob alike, surfaces as [`Error::IncorrectPassphrase`] so the
/// error channel cannot be used as an oracle.
fn unseal_seed(blob: &VaultBlob, passphrase: &str) -> Result<Zeroizing<Vec<u8>>> {
  let salt: Vec<u8> = jwu::decode_b64(&blob.kdf.salt).map_err(|_| Error::IncorrectPassphrase)?;
  let nonce: Vec<u8> = jwu::decode_b64(&blob.cipher.nonce).map_err(|_| Error::IncorrectPassphrase)?;
  let ciphertext: Vec<u8> = jwu::decode_b64(&blob.ciphertext).map_err(|_| Error::IncorrectPassphrase)?;
  let tag: Vec<u8> = jwu::decode_b64(&blob.tag).map_err(|_| Error::IncorrectPassphrase)?;

  let key: EncryptionKey =
    derive_encryption_key(passphrase, &salt, blob.kdf.work_factor).map_err(|_| Error::IncorrectPassphrase)?;

  let mut seed: Zeroizing<Vec<u8>> = Zeroizing::new(vec![0; ciphertext.len()]);
  let length: usize = Aes256Gcm::try_decrypt(key.as_ref(), &nonce, &[], &mut seed, &ciphertext, &tag)
    .map_err(|_| Error::IncorrectPassphrase)?;
  seed.truncate(length);

  Ok(seed)
}

/// Derives the agent's Ed25519 identity key from the seed: the SLIP-10
/// master node for the Ed25519 curve.
fn identity_jwk_from_seed(seed: &[u8]) -> Result<Jwk> {
  let mut node: Zeroizing<[u8; 64]> = Zeroizing::new([0u8; 64]);
  HMAC_SHA512(seed, ED25519_SEED_KEY, &mut node);

  let mut private: Jwk = Jwk {
    kty: JwkType::Okp,
    crv: Some("Ed25519".to_owned()),
    alg: Some("EdDSA".to_owned()),
    kid: None,
    x: None,
    y: None,
    d: Some(jwu::encode_b64(&node[..32])),
    use_: None,
    key_ops: None,
  };

  let public: Jwk = registry::public_key(&private)?;
  private.x = public.x.clone();
  private.kid = public.kid.clone();

  Ok(private)
}

fn agent_did_from_seed(seed: &[u8]) -> Result<String> {
  let private: Jwk = identity_jwk_from_seed(seed)?;
  let public: Jwk = private.to_public();
  Ok(DidDht::did_from_identity_key(&public)?.to_string())
}
