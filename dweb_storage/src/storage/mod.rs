// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod memstore;
mod traits;

pub use memstore::MemStore;
pub use traits::KeyValueStore;
