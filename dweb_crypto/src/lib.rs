// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic core of the DWN agent: a static registry of JOSE signature
//! algorithms keyed by `(alg, crv)`, the [`KeyManager`] contract for
//! content-addressed JWK stores, and the [`Signer`] capability handed to
//! message constructors.

pub mod algorithm;
mod ed25519;
pub mod error;
pub mod key_manager;
pub mod key_uri;
pub mod registry;
mod secp256k1;
mod secp256r1;
pub mod signer;

pub use algorithm::CryptoAlg;
pub use error::Error;
pub use error::KeyStorageError;
pub use error::KeyStorageErrorKind;
pub use error::Result;
pub use key_manager::KeyManager;
pub use key_manager::KeyManagerResult;
pub use key_uri::KeyUri;
pub use key_uri::KEY_URI_PREFIX;
pub use signer::KeyManagerSigner;
pub use signer::Signer;
