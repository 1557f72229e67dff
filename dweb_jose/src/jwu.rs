// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Utilities for base64url-encoded JOSE segments.

use base64ct::Base64UrlUnpadded;
use base64ct::Encoding;

use crate::error::Result;

/// Encodes `data` as base64url without padding.
pub fn encode_b64(data: impl AsRef<[u8]>) -> String {
  Base64UrlUnpadded::encode_string(data.as_ref())
}

/// Decodes base64url `data` without padding.
pub fn decode_b64(data: impl AsRef<[u8]>) -> Result<Vec<u8>> {
  Ok(Base64UrlUnpadded::decode_vec(core::str::from_utf8(data.as_ref()).map_err(|_| base64ct::Error::InvalidEncoding)?)?)
}

/// Encodes `value` as JSON and then as base64url without padding.
pub fn encode_b64_json<T: serde::Serialize>(value: &T) -> Result<String> {
  Ok(encode_b64(serde_json::to_vec(value)?))
}

/// Decodes a base64url segment and deserializes it from JSON.
pub fn decode_b64_json<T: serde::de::DeserializeOwned>(data: impl AsRef<[u8]>) -> Result<T> {
  Ok(serde_json::from_slice(&decode_b64(data)?)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn b64_roundtrip() {
    let data: &[u8] = b"{\"typ\":\"JWT\",\r\n \"alg\":\"HS256\"}";
    let encoded: String = encode_b64(data);
    assert!(!encoded.contains('='));
    assert_eq!(decode_b64(encoded.as_bytes()).unwrap(), data);
  }
}
