// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Parsing of DID URIs and DID URLs.

use core::fmt::Display;
use core::fmt::Formatter;
use core::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

const SCHEME: &str = "did:";

/// A parsed DID URI: `did:<method>:<method-specific-id>` with optional
/// path, query and fragment components (making it a DID URL).
#[derive(Clone, Debug, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DidUri {
  method: String,
  id: String,
  path: Option<String>,
  query: Option<String>,
  fragment: Option<String>,
}

impl DidUri {
  /// Parses a DID URI or DID URL.
  pub fn parse(input: &str) -> Result<Self> {
    let rest: &str = input
      .strip_prefix(SCHEME)
      .ok_or_else(|| Error::InvalidDid(format!("`{input}` does not start with `did:`")))?;

    let (method, rest) = rest
      .split_once(':')
      .ok_or_else(|| Error::InvalidDid(format!("`{input}` has no method-specific id")))?;

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()) {
      return Err(Error::InvalidDid(format!("`{method}` is not a valid method name")));
    }

    // Split trailing components in reverse significance: fragment, query, path.
    let (rest, fragment) = match rest.split_once('#') {
      Some((head, frag)) => (head, Some(frag.to_owned())),
      None => (rest, None),
    };
    let (rest, query) = match rest.split_once('?') {
      Some((head, query)) => (head, Some(query.to_owned())),
      None => (rest, None),
    };
    let (id, path) = match rest.split_once('/') {
      Some((head, path)) => (head, Some(format!("/{path}"))),
      None => (rest, None),
    };

    if id.is_empty() {
      return Err(Error::InvalidDid(format!("`{input}` has an empty method-specific id")));
    }
    if !id
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':' | b'%'))
    {
      return Err(Error::InvalidDid(format!("`{id}` contains invalid id characters")));
    }

    Ok(Self {
      method: method.to_owned(),
      id: id.to_owned(),
      path,
      query,
      fragment: fragment.filter(|f| !f.is_empty()),
    })
  }

  /// The method name, e.g. `jwk` in `did:jwk:...`.
  pub fn method(&self) -> &str {
    &self.method
  }

  /// The method-specific id.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// The path component, including its leading `/`.
  pub fn path(&self) -> Option<&str> {
    self.path.as_deref()
  }

  /// The query component, without the leading `?`.
  pub fn query(&self) -> Option<&str> {
    self.query.as_deref()
  }

  /// The fragment component, without the leading `#`.
  pub fn fragment(&self) -> Option<&str> {
    self.fragment.as_deref()
  }

  /// The bare DID (scheme, method and id), dropping path/query/fragment.
  pub fn to_did(&self) -> DidUri {
    DidUri {
      method: self.method.clone(),
      id: self.id.clone(),
      path: None,
      query: None,
      fragment: None,
    }
  }

  /// Returns a DID URL addressing `fragment` inside this DID.
  pub fn with_fragment(&self, fragment: &str) -> DidUri {
    DidUri {
      fragment: Some(fragment.trim_start_matches('#').to_owned()),
      ..self.to_did()
    }
  }
}

impl Display for DidUri {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{SCHEME}{}:{}", self.method, self.id)?;
    if let Some(path) = &self.path {
      write!(f, "{path}")?;
    }
    if let Some(query) = &self.query {
      write!(f, "?{query}")?;
    }
    if let Some(fragment) = &self.fragment {
      write!(f, "#{fragment}")?;
    }
    Ok(())
  }
}

impl FromStr for DidUri {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

impl TryFrom<String> for DidUri {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> {
    Self::parse(&value)
  }
}

impl From<DidUri> for String {
  fn from(value: DidUri) -> Self {
    value.to_string()
  }
}
