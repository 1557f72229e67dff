// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod crypto;

pub use crypto::derive_encryption_key;
pub use crypto::EncryptionKey;
