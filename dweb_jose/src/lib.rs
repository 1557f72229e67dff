// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! JOSE primitives shared by every layer of the DWN agent: the [`Jwk`] key
//! representation with RFC 7638 thumbprinting, base64url utilities, and the
//! General JWS envelope used by DWN message authorizations.

pub mod error;
pub mod jwk;
pub mod jws;
pub mod jwu;

pub use error::Error;
pub use error::Result;
pub use jwk::Jwk;
pub use jwk::JwkType;
pub use jws::GeneralJws;
pub use jws::JwsProtectedHeader;
pub use jws::SignatureEntry;
