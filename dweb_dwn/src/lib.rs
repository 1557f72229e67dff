// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! DWN messaging layer of the agent: typed message envelopes for the
//! Records, Protocols and Messages interfaces, content addressing of
//! messages and record data, and the contracts toward the local DWN engine
//! and remote DWN servers.

pub mod authorization;
pub mod cid;
pub mod error;
pub mod message;
pub mod reply;
pub mod request;
pub mod traits;

pub use authorization::Authorization;
pub use authorization::SignaturePayload;
pub use cid::compute_dag_cbor_cid;
pub use cid::compute_data_cid;
pub use cid::DataStream;
pub use error::Error;
pub use error::Result;
pub use message::*;
pub use reply::MessageReply;
pub use reply::ReplyEntry;
pub use reply::Status;
pub use request::DwnExecutor;
pub use request::DwnMessageReply;
pub use request::DwnRequest;
pub use request::MessageInput;
pub use request::MessageParams;
pub use traits::DwnNode;
pub use traits::DwnServerRpc;
pub use traits::HttpDwnRpc;

#[cfg(test)]
pub(crate) mod test_utils {
  use async_trait::async_trait;

  use dweb_crypto::registry;
  use dweb_crypto::CryptoAlg;
  use dweb_crypto::KeyManagerResult;
  use dweb_crypto::Signer;
  use dweb_jose::Jwk;

  /// A self-contained signer over a fresh Ed25519 key.
  #[derive(Debug)]
  pub(crate) struct TestSigner {
    key: Jwk,
    kid: String,
  }

  impl TestSigner {
    pub(crate) fn public_jwk(&self) -> Jwk {
      registry::public_key(&self.key).unwrap()
    }
  }

  #[cfg_attr(not(feature = "send-sync-storage"), async_trait(?Send))]
  #[cfg_attr(feature = "send-sync-storage", async_trait)]
  impl Signer for TestSigner {
    fn algorithm(&self) -> &str {
      "EdDSA"
    }

    fn key_id(&self) -> &str {
      &self.kid
    }

    async fn sign(&self, data: &[u8]) -> KeyManagerResult<Vec<u8>> {
      Ok(registry::sign(&self.key, data)?)
    }
  }

  pub(crate) fn test_signer(kid: &str) -> TestSigner {
    TestSigner {
      key: registry::generate_key(CryptoAlg::Ed25519).unwrap(),
      kid: kid.to_owned(),
    }
  }
}
