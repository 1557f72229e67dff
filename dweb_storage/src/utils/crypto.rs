// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crypto::keys::pbkdf::PBKDF2_HMAC_SHA512;
use zeroize::Zeroizing;

use crate::error::Error;
use crate::error::Result;

/// A derived 256-bit content-encryption key.
pub type EncryptionKey = Zeroizing<[u8; 32]>;

/// Stretches `passphrase` into a content-encryption key with
/// PBKDF2-HMAC-SHA512 over the given salt and iteration count.
pub fn derive_encryption_key(passphrase: &str, salt: &[u8], work_factor: usize) -> Result<EncryptionKey> {
  let mut output: EncryptionKey = Zeroizing::new([0u8; 32]);

  PBKDF2_HMAC_SHA512(passphrase.as_bytes(), salt, work_factor, output.as_mut())
    .map_err(|err| Error::VaultCrypto(err.to_string()))?;

  Ok(output)
}
