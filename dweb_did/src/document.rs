// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DID document model.

use core::fmt::Display;
use core::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use dweb_jose::Jwk;

/// The verification relationships a method may be referenced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationRelationship {
  /// `authentication`
  Authentication,
  /// `assertionMethod`
  AssertionMethod,
  /// `keyAgreement`
  KeyAgreement,
  /// `capabilityInvocation`
  CapabilityInvocation,
  /// `capabilityDelegation`
  CapabilityDelegation,
}

impl VerificationRelationship {
  /// All relationships, in document order.
  pub const ALL: [VerificationRelationship; 5] = [
    Self::Authentication,
    Self::AssertionMethod,
    Self::KeyAgreement,
    Self::CapabilityInvocation,
    Self::CapabilityDelegation,
  ];

  /// The camelCase property name used in DID documents.
  pub const fn property_name(&self) -> &'static str {
    match self {
      Self::Authentication => "authentication",
      Self::AssertionMethod => "assertionMethod",
      Self::KeyAgreement => "keyAgreement",
      Self::CapabilityInvocation => "capabilityInvocation",
      Self::CapabilityDelegation => "capabilityDelegation",
    }
  }
}

impl Display for VerificationRelationship {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.write_str(self.property_name())
  }
}

/// A single verification method of a DID document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
  /// Method id, absolute or `#fragment`-relative to the document id.
  pub id: String,
  /// Method type; the agent emits `JsonWebKey` methods exclusively.
  #[serde(rename = "type")]
  pub type_: String,
  /// The DID controlling this method.
  pub controller: String,
  /// The public key backing this method.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub public_key_jwk: Option<Jwk>,
}

impl VerificationMethod {
  /// Returns the fragment of the method id, without the leading `#`.
  pub fn fragment(&self) -> Option<&str> {
    self.id.rsplit_once('#').map(|(_, fragment)| fragment)
  }

  /// Returns `true` if this method is addressed by `reference`, which may
  /// be an absolute DID URL or a bare `#fragment`.
  pub fn matches_id(&self, reference: &str) -> bool {
    if self.id == reference {
      return true;
    }
    match (reference.rsplit_once('#'), self.fragment()) {
      (Some((_, wanted)), Some(own)) => wanted == own,
      _ => false,
    }
  }
}

/// A reference to a verification method inside a relationship list: either
/// the id of a method defined in `verificationMethod`, or an inline method.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MethodRef {
  /// Reference by id.
  Reference(String),
  /// Inline (embedded) verification method.
  Embedded(VerificationMethod),
}

impl MethodRef {
  /// Returns the id this reference points at.
  pub fn id(&self) -> &str {
    match self {
      Self::Reference(id) => id,
      Self::Embedded(method) => &method.id,
    }
  }
}

/// A service endpoint entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
  /// Service id, absolute or `#fragment`-relative.
  pub id: String,
  /// Service type.
  #[serde(rename = "type")]
  pub type_: String,
  /// One or more endpoint URIs.
  pub service_endpoint: serde_json::Value,
}

/// A DID document.
///
/// Every id referenced from a relationship list resolves to an entry of
/// `verification_method` or is embedded inline; [`Document::resolve_method`]
/// searches both.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  /// The document id: the subject DID.
  pub id: String,
  /// Declared verification methods.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub verification_method: Vec<VerificationMethod>,
  /// `authentication` relationship.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub authentication: Vec<MethodRef>,
  /// `assertionMethod` relationship.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub assertion_method: Vec<MethodRef>,
  /// `keyAgreement` relationship.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub key_agreement: Vec<MethodRef>,
  /// `capabilityInvocation` relationship.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub capability_invocation: Vec<MethodRef>,
  /// `capabilityDelegation` relationship.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub capability_delegation: Vec<MethodRef>,
  /// Declared services.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub service: Vec<Service>,
}

impl Document {
  /// Creates an empty document for the given subject.
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      verification_method: Vec::new(),
      authentication: Vec::new(),
      assertion_method: Vec::new(),
      key_agreement: Vec::new(),
      capability_invocation: Vec::new(),
      capability_delegation: Vec::new(),
      service: Vec::new(),
    }
  }

  /// Returns the references of the given relationship.
  pub fn relationship(&self, relationship: VerificationRelationship) -> &[MethodRef] {
    match relationship {
      VerificationRelationship::Authentication => &self.authentication,
      VerificationRelationship::AssertionMethod => &self.assertion_method,
      VerificationRelationship::KeyAgreement => &self.key_agreement,
      VerificationRelationship::CapabilityInvocation => &self.capability_invocation,
      VerificationRelationship::CapabilityDelegation => &self.capability_delegation,
    }
  }

  /// Resolves a method by absolute id or bare fragment, searching declared
  /// and embedded methods.
  pub fn resolve_method(&self, reference: &str) -> Option<&VerificationMethod> {
    if let Some(method) = self.verification_method.iter().find(|method| method.matches_id(reference)) {
      return Some(method);
    }
    VerificationRelationship::ALL
      .iter()
      .flat_map(|relationship| self.relationship(*relationship))
      .find_map(|method_ref| match method_ref {
        MethodRef::Embedded(method) if method.matches_id(reference) => Some(method),
        _ => None,
      })
  }

  /// Returns the relationships that reference the method with the given id.
  pub fn method_purposes(&self, method_id: &str) -> Vec<VerificationRelationship> {
    VerificationRelationship::ALL
      .into_iter()
      .filter(|relationship| {
        self
          .relationship(*relationship)
          .iter()
          .any(|method_ref| method_ref.id() == method_id || reference_matches_fragment(method_ref.id(), method_id))
      })
      .collect()
  }

  /// Finds a verification method whose public JWK has the given RFC 7638
  /// thumbprint.
  pub fn find_method_by_thumbprint(&self, thumbprint: &str) -> Option<&VerificationMethod> {
    self.verification_method.iter().find(|method| {
      method
        .public_key_jwk
        .as_ref()
        .and_then(|jwk| jwk.thumbprint_sha256_b64().ok())
        .is_some_and(|candidate| candidate == thumbprint)
    })
  }

  /// Selects the default signing method: the first resolvable
  /// `assertionMethod` reference, falling back to the first declared
  /// verification method.
  pub fn default_signing_method(&self) -> Option<&VerificationMethod> {
    self
      .assertion_method
      .first()
      .and_then(|method_ref| match method_ref {
        MethodRef::Reference(id) => self.resolve_method(id),
        MethodRef::Embedded(method) => Some(method),
      })
      .or_else(|| self.verification_method.first())
  }

  /// Resolves a service by absolute id or bare fragment.
  pub fn resolve_service(&self, reference: &str) -> Option<&Service> {
    self.service.iter().find(|service| {
      service.id == reference
        || match (reference.rsplit_once('#'), service.id.rsplit_once('#')) {
          (Some((_, wanted)), Some((_, own))) => wanted == own,
          _ => reference.strip_prefix('#').is_some_and(|frag| service.id.ends_with(&format!("#{frag}"))),
        }
    })
  }
}

fn reference_matches_fragment(reference: &str, method_id: &str) -> bool {
  match (reference.rsplit_once('#'), method_id.rsplit_once('#')) {
    (Some((_, a)), Some((_, b))) => a == b,
    _ => false,
  }
}
