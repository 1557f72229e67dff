// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Permission grants for the DWN agent: signed, scoped, optionally
//! delegated and revocable capabilities expressed as records under the
//! permissions protocol.

pub mod api;
pub mod cache;
pub mod error;
pub mod grant;
pub mod matching;
pub mod scope;

pub use api::CreateGrantOptions;
pub use api::PermissionLookup;
pub use api::PermissionsApi;
pub use cache::GrantCache;
pub use cache::DEFAULT_GRANT_TTL;
pub use error::Error;
pub use error::Result;
pub use grant::GrantData;
pub use grant::PermissionGrant;
pub use grant::PermissionRequest;
pub use grant::PermissionRevocation;
pub use grant::RequestData;
pub use grant::RevocationData;
pub use grant::GRANT_PATH;
pub use grant::PERMISSIONS_PROTOCOL;
pub use grant::REQUEST_PATH;
pub use grant::REVOCATION_PATH;
pub use matching::find_matching_grant;
pub use matching::GrantQuery;
pub use scope::PermissionScope;

#[cfg(test)]
pub(crate) mod test_utils {
  use async_trait::async_trait;

  use dweb_crypto::registry;
  use dweb_crypto::CryptoAlg;
  use dweb_crypto::KeyManagerResult;
  use dweb_crypto::Signer;
  use dweb_jose::Jwk;

  use dweb_dwn::RecordsWriteMessage;
  use dweb_dwn::RecordsWriteOptions;
  use dweb_dwn::Tags;

  use crate::grant::GrantData;
  use crate::grant::PermissionGrant;
  use crate::grant::GRANT_PATH;
  use crate::grant::PERMISSIONS_PROTOCOL;
  use crate::scope::PermissionScope;

  /// A self-contained signer over a fresh Ed25519 key.
  #[derive(Debug)]
  pub(crate) struct TestSigner {
    key: Jwk,
    kid: String,
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

  pub(crate) fn signer_for(did: &str) -> TestSigner {
    TestSigner {
      key: registry::generate_key(CryptoAlg::Ed25519).unwrap(),
      kid: format!("{did}#0"),
    }
  }

  /// Builds a real signed grant record and parses it back.
  pub(crate) async fn grant_with_scope(grantor: &str, grantee: &str, scope: PermissionScope) -> PermissionGrant {
    let data: GrantData = GrantData {
      date_expires: "2099-01-01T00:00:00.000000Z".to_owned(),
      delegated: None,
      request_id: None,
      description: None,
      scope,
    };

    let tags: Option<Tags> = data.scope.protocol.as_deref().map(|protocol| {
      let mut tags: Tags = Tags::new();
      tags.insert("protocol".to_owned(), serde_json::Value::String(protocol.to_owned()));
      tags
    });

    let options: RecordsWriteOptions = RecordsWriteOptions {
      data_format: "application/json".to_owned(),
      data: Some(serde_json::to_vec(&data).unwrap()),
      protocol: Some(PERMISSIONS_PROTOCOL.to_owned()),
      protocol_path: Some(GRANT_PATH.to_owned()),
      recipient: Some(grantee.to_owned()),
      tags,
      ..RecordsWriteOptions::default()
    };

    let message: RecordsWriteMessage = RecordsWriteMessage::create(options, &signer_for(grantor)).await.unwrap();
    PermissionGrant::try_from_message(message).unwrap()
  }
}
