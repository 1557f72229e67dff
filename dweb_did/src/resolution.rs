// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! DID resolution results.
//!
//! Resolution never raises: negative outcomes are encoded in
//! `didResolutionMetadata.error`, matching the W3C DID resolution contract.
//! Results carrying an error are never cached.

use serde::Deserialize;
use serde::Serialize;

use crate::document::Document;

/// The well-known resolution error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum ResolutionError {
  /// The input is not a conformant DID.
  #[serde(rename = "invalidDid")]
  InvalidDid,
  /// The input is not a conformant DID URL.
  #[serde(rename = "invalidDidUrl")]
  InvalidDidUrl,
  /// No back-end is registered for the DID's method.
  #[serde(rename = "methodNotSupported")]
  MethodNotSupported,
  /// The DID (or the dereferenced resource) does not exist.
  #[serde(rename = "notFound")]
  NotFound,
  /// The document exists but cannot be returned in the requested
  /// representation.
  #[serde(rename = "representationNotSupported")]
  RepresentationNotSupported,
  /// The method back-end failed internally.
  #[serde(rename = "internalError")]
  InternalError,
}

impl ResolutionError {
  /// The spec string of the error code.
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::InvalidDid => "invalidDid",
      Self::InvalidDidUrl => "invalidDidUrl",
      Self::MethodNotSupported => "methodNotSupported",
      Self::NotFound => "notFound",
      Self::RepresentationNotSupported => "representationNotSupported",
      Self::InternalError => "internalError",
    }
  }
}

impl core::fmt::Display for ResolutionError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Metadata about the resolution process itself.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionMetadata {
  /// The error code, absent on success.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<ResolutionError>,
  /// Media type of the returned representation.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content_type: Option<String>,
}

/// Metadata about the resolved document.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
  /// Timestamp of the document's creation.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created: Option<String>,
  /// Timestamp of the document's last update.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated: Option<String>,
  /// Whether the DID has been deactivated.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deactivated: Option<bool>,
  /// Method-specific version identifier.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version_id: Option<String>,
}

/// The outcome of resolving a DID.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
  /// Resolution process metadata; carries the error code on failure.
  #[serde(default)]
  pub did_resolution_metadata: ResolutionMetadata,
  /// The resolved document, absent on failure.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub did_document: Option<Document>,
  /// Document metadata.
  #[serde(default)]
  pub did_document_metadata: DocumentMetadata,
}

impl ResolutionResult {
  /// Media type for JSON DID documents.
  pub const MEDIA_TYPE: &'static str = "application/did+json";

  /// A successful result wrapping `document`.
  pub fn from_document(document: Document) -> Self {
    Self {
      did_resolution_metadata: ResolutionMetadata {
        error: None,
        content_type: Some(Self::MEDIA_TYPE.to_owned()),
      },
      did_document: Some(document),
      did_document_metadata: DocumentMetadata::default(),
    }
  }

  /// A negative result carrying `error` and no document.
  pub fn from_error(error: ResolutionError) -> Self {
    Self {
      did_resolution_metadata: ResolutionMetadata {
        error: Some(error),
        content_type: None,
      },
      did_document: None,
      did_document_metadata: DocumentMetadata::default(),
    }
  }

  /// Returns `true` if resolution succeeded.
  pub fn is_success(&self) -> bool {
    self.did_resolution_metadata.error.is_none() && self.did_document.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_codes_serialize_to_spec_strings() {
    assert_eq!(
      serde_json::to_string(&ResolutionError::MethodNotSupported).unwrap(),
      "\"methodNotSupported\""
    );
    assert_eq!(serde_json::to_string(&ResolutionError::InvalidDid).unwrap(), "\"invalidDid\"");
  }

  #[test]
  fn negative_results_carry_no_document() {
    let result: ResolutionResult = ResolutionResult::from_error(ResolutionError::NotFound);
    assert!(!result.is_success());
    assert!(result.did_document.is_none());
  }
}
