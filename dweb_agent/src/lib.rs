// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The DWN agent facade: a passphrase-gated identity core that owns DIDs,
//! holds their keys, issues and verifies permission grants, and mediates
//! record operations against local and remote Decentralized Web Nodes.

pub mod agent;
pub mod builder;
pub mod did_api;
pub mod error;
pub mod pipeline;

pub use agent::Agent;
pub use agent::CreateIdentityOptions;
pub use builder::AgentBuilder;
pub use did_api::DidRequest;
pub use did_api::DidResponse;
pub use error::Error;
pub use error::Result;
pub use pipeline::DwnApi;
pub use pipeline::DWN_SERVICE_TYPE;
