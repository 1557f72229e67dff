// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Message authorization: General JWS envelopes over signature payloads.

use serde::Deserialize;
use serde::Serialize;

use dweb_crypto::Signer;
use dweb_jose::GeneralJws;
use dweb_jose::JwsProtectedHeader;

use crate::error::Result;

/// The payload signed into a message's authorization JWS.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
  /// The signed record id; `RecordsWrite` only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub record_id: Option<String>,
  /// CID of the message descriptor.
  pub descriptor_cid: String,
  /// The record's context id; protocol-bound `RecordsWrite` only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context_id: Option<String>,
  /// Protocol role invoked by the author.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol_role: Option<String>,
  /// Id of the permission grant authorizing this message.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub permission_grant_id: Option<String>,
  /// CID of the delegated grant under which the signer acts.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delegated_grant_id: Option<String>,
}

impl SignaturePayload {
  /// A payload carrying only the descriptor CID, as used by owner
  /// signatures and the read-style interfaces.
  pub fn descriptor_only(descriptor_cid: String) -> Self {
    Self {
      descriptor_cid,
      ..Self::default()
    }
  }
}

/// The authorization block of a message.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
  /// The author's signature over the message's [`SignaturePayload`].
  pub signature: GeneralJws,
  /// The tenant owner's counter-signature, attached when a message is
  /// stored on behalf of the target tenant.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner_signature: Option<GeneralJws>,
}

impl Authorization {
  /// Signs `payload` with `signer` and wraps it as an authorization block.
  pub async fn create(payload: &SignaturePayload, signer: &dyn Signer) -> Result<Self> {
    Ok(Self {
      signature: sign_general_jws(&serde_json::to_vec(payload)?, signer).await?,
      owner_signature: None,
    })
  }

  /// The signed payload.
  pub fn payload(&self) -> Result<SignaturePayload> {
    Ok(serde_json::from_slice(&self.signature.decoded_payload()?)?)
  }

  /// The author DID: the `kid` of the first signature, stripped of its
  /// fragment.
  pub fn author(&self) -> Option<String> {
    let kid: String = self.signature.signer_kid().ok()?;
    Some(kid.split('#').next().unwrap_or(&kid).to_owned())
  }
}

/// Signs `payload` into a single-signature General JWS.
pub async fn sign_general_jws(payload: &[u8], signer: &dyn Signer) -> Result<GeneralJws> {
  let mut jws: GeneralJws = GeneralJws::new(payload);
  let header: JwsProtectedHeader = JwsProtectedHeader {
    kid: signer.key_id().to_owned(),
    alg: signer.algorithm().to_owned(),
  };

  let (protected, signing_input) = jws.signing_input(&header)?;
  let signature: Vec<u8> = signer.sign(&signing_input).await?;
  jws.attach_signature(protected, &signature);

  Ok(jws)
}
