// Copyright 2020-2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Content addressing for DWN messages and record data.
//!
//! Messages are addressed by a CIDv1 over their DAG-CBOR encoding; record
//! data is addressed by a CIDv1 over a single DAG-PB/UnixFS file node, the
//! addressing scheme DWN data stores use on the wire.

use cid::Cid;
use multihash_codetable::Code;
use multihash_codetable::MultihashDigest;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

const DAG_CBOR_CODEC: u64 = 0x71;
const DAG_PB_CODEC: u64 = 0x70;

// UnixFS `DataType::File`.
const UNIXFS_FILE: u64 = 2;

/// Computes the CIDv1 (DAG-CBOR, SHA2-256) of any serializable value.
pub fn compute_dag_cbor_cid<T: Serialize>(value: &T) -> Result<String> {
  let bytes: Vec<u8> = serde_ipld_dagcbor::to_vec(value).map_err(|err| Error::Cid(err.to_string()))?;
  Ok(Cid::new_v1(DAG_CBOR_CODEC, Code::Sha2_256.digest(&bytes)).to_string())
}

/// Computes the CIDv1 (DAG-PB, SHA2-256) of record data, wrapping the bytes
/// in a single UnixFS file node. Data streams are bounded, so no chunking
/// is performed.
pub fn compute_data_cid(data: &[u8]) -> String {
  let node: Vec<u8> = encode_pb_node(data);
  Cid::new_v1(DAG_PB_CODEC, Code::Sha2_256.digest(&node)).to_string()
}

// PBNode { Data = 1: bytes } with zero links, where Data is the UnixFS
// message { Type = 1: varint, Data = 2: bytes, filesize = 3: varint }.
fn encode_pb_node(data: &[u8]) -> Vec<u8> {
  let mut unixfs: Vec<u8> = Vec::with_capacity(data.len() + 16);
  unixfs.push(0x08); // field 1, varint
  encode_varint(UNIXFS_FILE, &mut unixfs);
  unixfs.push(0x12); // field 2, length-delimited
  encode_varint(data.len() as u64, &mut unixfs);
  unixfs.extend_from_slice(data);
  unixfs.push(0x18); // field 3, varint
  encode_varint(data.len() as u64, &mut unixfs);

  let mut node: Vec<u8> = Vec::with_capacity(unixfs.len() + 8);
  node.push(0x0a); // field 1, length-delimited
  encode_varint(unixfs.len() as u64, &mut node);
  node.extend_from_slice(&unixfs);
  node
}

fn encode_varint(mut value: u64, output: &mut Vec<u8>) {
  loop {
    let mut byte: u8 = (value & 0x7f) as u8;
    value >>= 7;
    if value != 0 {
      byte |= 0x80;
    }
    output.push(byte);
    if value == 0 {
      break;
    }
  }
}

/// Record data with replay semantics.
///
/// Whenever data feeds both CID computation and DWN processing, the stream
/// is forked instead of consumed: every fork replays the full content.
/// Streams are buffered in memory; unbounded streams are unsupported.
#[derive(Clone, Debug)]
pub struct DataStream {
  bytes: std::sync::Arc<Vec<u8>>,
}

impl DataStream {
  /// Chunk size used when replaying as a byte-chunk stream.
  pub const CHUNK_SIZE: usize = 32 * 1024;

  /// Wraps in-memory bytes.
  pub fn from_bytes(bytes: Vec<u8>) -> Self {
    Self {
      bytes: std::sync::Arc::new(bytes),
    }
  }

  /// Collects a chunked byte stream into replayable form.
  pub async fn from_stream<S>(stream: S) -> Self
  where
    S: futures::Stream<Item = Vec<u8>>,
  {
    use futures::StreamExt;

    let mut bytes: Vec<u8> = Vec::new();
    futures::pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
      bytes.extend_from_slice(&chunk);
    }
    Self::from_bytes(bytes)
  }

  /// A second, independent handle over the same content.
  pub fn fork(&self) -> Self {
    self.clone()
  }

  /// The full content.
  pub fn as_slice(&self) -> &[u8] {
    &self.bytes
  }

  /// The content length in bytes.
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  /// Returns `true` when the content is empty.
  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// The DAG-PB CID of the content.
  pub fn compute_cid(&self) -> String {
    compute_data_cid(&self.bytes)
  }

  /// Replays the content as a chunked stream.
  pub fn into_stream(self) -> impl futures::Stream<Item = Vec<u8>> {
    let bytes: Vec<u8> = self.bytes.as_ref().clone();
    futures::stream::iter(
      bytes
        .chunks(Self::CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect::<Vec<Vec<u8>>>(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dag_cbor_cid_is_deterministic() {
    let value = serde_json::json!({"b": 1, "a": {"nested": true}});
    let first: String = compute_dag_cbor_cid(&value).unwrap();
    let second: String = compute_dag_cbor_cid(&value).unwrap();

    assert_eq!(first, second);
    // CIDv1 in base32 lower.
    assert!(first.starts_with('b'));
  }

  #[test]
  fn data_cid_changes_with_content() {
    let a: String = compute_data_cid(b"hello");
    let b: String = compute_data_cid(b"hello!");
    assert_ne!(a, b);
    assert_eq!(a, compute_data_cid(b"hello"));
  }

  #[test]
  fn varint_layout() {
    let mut buffer: Vec<u8> = Vec::new();
    encode_varint(0, &mut buffer);
    encode_varint(127, &mut buffer);
    encode_varint(128, &mut buffer);
    encode_varint(300, &mut buffer);
    assert_eq!(buffer, vec![0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);
  }

  #[tokio::test]
  async fn stream_fork_replays_the_full_content() {
    use futures::StreamExt;

    let stream = futures::stream::iter(vec![b"ab".to_vec(), b"cd".to_vec()]);
    let data: DataStream = DataStream::from_stream(stream).await;

    let fork: DataStream = data.fork();
    assert_eq!(fork.compute_cid(), data.compute_cid());

    let replayed: Vec<u8> = fork.into_stream().concat().await;
    assert_eq!(replayed, b"abcd");
    assert_eq!(data.as_slice(), b"abcd");
  }
}
