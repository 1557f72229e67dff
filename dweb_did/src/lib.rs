// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DID subsystem of the DWN agent: URI parsing, the document model,
//! pluggable method back-ends with cached resolution, and construction of
//! signers bound to a DID's keys.

pub mod bearer;
pub mod dereference;
pub mod did;
pub mod document;
pub mod error;
pub mod method;
pub mod methods;
pub mod resolution;
pub mod resolver;

pub use bearer::BearerDid;
pub use bearer::DidMetadata;
pub use bearer::PortableDid;
pub use bearer::PortableVerificationMethod;
pub use dereference::dereference;
pub use dereference::Resource;
pub use did::DidUri;
pub use document::Document;
pub use document::MethodRef;
pub use document::Service;
pub use document::VerificationMethod;
pub use document::VerificationRelationship;
pub use error::Error;
pub use error::Result;
pub use method::CreateOptions;
pub use method::DidMethod;
pub use methods::DidDht;
pub use methods::DidJwk;
pub use methods::DidKey;
pub use methods::DidWeb;
pub use resolution::ResolutionError;
pub use resolution::ResolutionResult;
pub use resolver::Resolver;
