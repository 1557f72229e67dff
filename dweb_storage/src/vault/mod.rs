// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod blob;
#[allow(clippy::module_inception)]
mod vault;

pub use blob::VaultBackup;
pub use blob::VaultBlob;
pub use blob::VaultCipherParams;
pub use blob::VaultKdfParams;
pub use blob::VaultRecord;
pub use blob::VaultStatus;
pub use vault::Vault;
