// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DID method back-ends shipped with the agent.

mod dht;
mod jwk;
mod key;
mod web;

pub use dht::DidDht;
pub use jwk::DidJwk;
pub use key::DidKey;
pub use web::DidWeb;

use dweb_jose::Jwk;

use crate::did::DidUri;
use crate::document::Document;
use crate::document::MethodRef;
use crate::document::VerificationMethod;
use crate::document::VerificationRelationship;

/// The verification method type emitted by all built-in methods.
pub(crate) const METHOD_TYPE_JSON_WEB_KEY: &str = "JsonWebKey";

/// Builds a single-key DID document: one verification method under
/// `fragment`, referenced from every relationship.
pub(crate) fn single_key_document(did: &DidUri, fragment: &str, public_jwk: Jwk) -> Document {
  let method_id: String = format!("{did}#{fragment}");
  let method: VerificationMethod = VerificationMethod {
    id: method_id.clone(),
    type_: METHOD_TYPE_JSON_WEB_KEY.to_owned(),
    controller: did.to_string(),
    public_key_jwk: Some(public_jwk),
  };

  let mut document: Document = Document::new(did.to_string());
  document.verification_method.push(method);
  for relationship in VerificationRelationship::ALL {
    match relationship {
      VerificationRelationship::Authentication => document.authentication.push(MethodRef::Reference(method_id.clone())),
      VerificationRelationship::AssertionMethod => {
        document.assertion_method.push(MethodRef::Reference(method_id.clone()))
      }
      VerificationRelationship::KeyAgreement => document.key_agreement.push(MethodRef::Reference(method_id.clone())),
      VerificationRelationship::CapabilityInvocation => {
        document.capability_invocation.push(MethodRef::Reference(method_id.clone()))
      }
      VerificationRelationship::CapabilityDelegation => {
        document.capability_delegation.push(MethodRef::Reference(method_id.clone()))
      }
    }
  }

  document
}
