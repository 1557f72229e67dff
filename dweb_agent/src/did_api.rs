// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DID request surface of the agent facade.

use dweb_did::BearerDid;
use dweb_did::CreateOptions;
use dweb_did::ResolutionResult;

/// A DID operation routed through the agent.
#[derive(Debug)]
pub enum DidRequest {
  /// Create a new DID of the given method.
  Create {
    /// Method name, e.g. `"jwk"`.
    method: String,
    /// Creation options.
    options: CreateOptions,
  },
  /// Resolve a DID.
  Resolve {
    /// The DID to resolve.
    did: String,
  },
  /// Update a DID document. Not implemented.
  Update {
    /// The DID to update.
    did: String,
  },
  /// Deactivate a DID. Not implemented.
  Deactivate {
    /// The DID to deactivate.
    did: String,
  },
}

/// The outcome of a [`DidRequest`].
#[derive(Debug)]
pub enum DidResponse {
  /// A freshly created DID, its keys persisted in the agent key manager.
  Created(Box<BearerDid>),
  /// A resolution result; negative outcomes travel in its metadata.
  Resolved(Box<ResolutionResult>),
}
