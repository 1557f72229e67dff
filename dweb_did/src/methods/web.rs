// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The `did:web` method: documents are hosted as `did.json` under the
//! domain encoded in the method-specific id. Resolve-only; creation is a
//! hosting concern, not a key operation.

use std::sync::Arc;

use async_trait::async_trait;

use dweb_crypto::KeyManager;

use crate::bearer::BearerDid;
use crate::did::DidUri;
use crate::document::Document;
use crate::error::Error;
use crate::error::Result;
use crate::method::CreateOptions;
use crate::method::DidMethod;
use crate::resolution::ResolutionError;
use crate::resolution::ResolutionResult;

/// `did:web` back-end.
#[derive(Clone, Debug, Default)]
pub struct DidWeb {
  client: reqwest::Client,
}

impl DidWeb {
  /// The method name.
  pub const NAME: &'static str = "web";

  /// Creates a back-end with a default HTTP client.
  pub fn new() -> Self {
    Self::default()
  }

  /// Maps a `did:web` method-specific id to the URL of its `did.json`.
  ///
  /// `example.com` → `https://example.com/.well-known/did.json`;
  /// `example.com:user:alice` → `https://example.com/user/alice/did.json`.
  /// A port is percent-encoded in the first segment (`%3A`).
  pub fn to_url(id: &str) -> Result<String> {
    let mut segments = id.split(':');
    let domain: &str = segments.next().filter(|s| !s.is_empty()).ok_or_else(|| {
      Error::InvalidDid(format!("`{id}` holds no did:web domain"))
    })?;
    let domain: String = domain.replace("%3A", ":").replace("%3a", ":");

    let path: Vec<&str> = segments.collect();
    if path.is_empty() {
      Ok(format!("https://{domain}/.well-known/did.json"))
    } else if path.iter().any(|segment| segment.is_empty()) {
      Err(Error::InvalidDid(format!("`{id}` holds an empty did:web path segment")))
    } else {
      Ok(format!("https://{domain}/{}/did.json", path.join("/")))
    }
  }
}

#[async_trait]
impl DidMethod for DidWeb {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  async fn create(&self, _key_manager: &Arc<dyn KeyManager>, _options: CreateOptions) -> Result<BearerDid> {
    Err(Error::MethodNotSupported("web (resolve-only)".to_owned()))
  }

  async fn resolve(&self, did: &str) -> ResolutionResult {
    let Ok(uri) = DidUri::parse(did) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };
    if uri.method() != Self::NAME {
      return ResolutionResult::from_error(ResolutionError::MethodNotSupported);
    }
    let Ok(url) = Self::to_url(uri.id()) else {
      return ResolutionResult::from_error(ResolutionError::InvalidDid);
    };

    tracing::debug!(%url, "resolving did:web document");

    let response = match self.client.get(&url).send().await {
      Ok(response) => response,
      Err(_) => return ResolutionResult::from_error(ResolutionError::NotFound),
    };
    if !response.status().is_success() {
      return ResolutionResult::from_error(ResolutionError::NotFound);
    }

    match response.json::<Document>().await {
      Ok(document) => ResolutionResult::from_document(document),
      Err(_) => ResolutionResult::from_error(ResolutionError::RepresentationNotSupported),
    }
  }
}
