// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The General JWS serialization used by DWN message authorizations.
//!
//! Signing is layered: this module only assembles and inspects envelopes;
//! the signature bytes themselves are produced by whatever signer the
//! caller binds (see `dweb_crypto::Signer`).

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::jwu;

/// The protected header of a single JWS signature entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct JwsProtectedHeader {
  /// Fully qualified key id (a DID URL or a `urn:jwk:` key URI).
  pub kid: String,
  /// JWS algorithm name.
  pub alg: String,
}

/// One signature over the shared payload of a [`GeneralJws`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SignatureEntry {
  /// base64url-encoded protected header JSON.
  pub protected: String,
  /// base64url-encoded signature bytes.
  pub signature: String,
}

impl SignatureEntry {
  /// Decodes the protected header of this entry.
  pub fn protected_header(&self) -> Result<JwsProtectedHeader> {
    jwu::decode_b64_json(self.protected.as_bytes())
  }
}

/// A JWS in General JSON serialization: one payload, any number of
/// signatures.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GeneralJws {
  /// base64url-encoded payload.
  pub payload: String,
  /// Signatures over the payload.
  pub signatures: Vec<SignatureEntry>,
}

impl GeneralJws {
  /// Creates an envelope over the given payload bytes with no signatures
  /// attached yet.
  pub fn new(payload: &[u8]) -> Self {
    Self {
      payload: jwu::encode_b64(payload),
      signatures: Vec::new(),
    }
  }

  /// Returns the JWS signing input (`b64(protected) || '.' || b64(payload)`)
  /// for a prospective signature with the given protected header.
  pub fn signing_input(&self, header: &JwsProtectedHeader) -> Result<(String, Vec<u8>)> {
    let protected: String = jwu::encode_b64_json(header)?;
    let input: Vec<u8> = format!("{protected}.{}", self.payload).into_bytes();
    Ok((protected, input))
  }

  /// Attaches a precomputed signature produced over [`Self::signing_input`].
  pub fn attach_signature(&mut self, protected: String, signature: &[u8]) {
    self.signatures.push(SignatureEntry {
      protected,
      signature: jwu::encode_b64(signature),
    });
  }

  /// Returns the first signature entry; every valid DWN authorization has
  /// at least one.
  pub fn first_signature(&self) -> Result<&SignatureEntry> {
    self.signatures.first().ok_or(Error::MissingSignature)
  }

  /// Decodes the payload bytes.
  pub fn decoded_payload(&self) -> Result<Vec<u8>> {
    jwu::decode_b64(self.payload.as_bytes())
  }

  /// Returns the `kid` of the first signature, the conventional author hint.
  pub fn signer_kid(&self) -> Result<String> {
    Ok(self.first_signature()?.protected_header()?.kid)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signing_input_layout() {
    let jws: GeneralJws = GeneralJws::new(b"{\"descriptorCid\":\"bafy\"}");
    let header: JwsProtectedHeader = JwsProtectedHeader {
      kid: "did:example:alice#key-1".to_owned(),
      alg: "EdDSA".to_owned(),
    };

    let (protected, input) = jws.signing_input(&header).unwrap();
    let rendered: String = String::from_utf8(input).unwrap();
    assert_eq!(rendered, format!("{protected}.{}", jws.payload));

    let decoded: JwsProtectedHeader = jwu::decode_b64_json(protected.as_bytes()).unwrap();
    assert_eq!(decoded, header);
  }

  #[test]
  fn attach_and_read_back() {
    let mut jws: GeneralJws = GeneralJws::new(b"payload");
    let header: JwsProtectedHeader = JwsProtectedHeader {
      kid: "urn:jwk:abc".to_owned(),
      alg: "ES256K".to_owned(),
    };
    let (protected, _input) = jws.signing_input(&header).unwrap();
    jws.attach_signature(protected, &[1, 2, 3]);

    assert_eq!(jws.signer_kid().unwrap(), "urn:jwk:abc");
    assert_eq!(jws.decoded_payload().unwrap(), b"payload");
  }
}
