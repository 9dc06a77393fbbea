// Copyright 2020 Red Hat, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Block Hasher (spec.md §4.1): reads a [`ByteSource`] sequentially and
//! emits `(offset, hash)` for each full, block-aligned window. A trailing
//! partial block is never hashed -- its bytes still participate as
//! literals, just not as index/candidate material.

use crate::error::Result;
use crate::source::ByteSource;

/// A 128-bit MurmurHash3 x64 digest, keyed with seed 0.
pub type BlockHash = u128;

pub fn hash_block(bytes: &[u8]) -> BlockHash {
    // murmur3's x64_128 reader never fails on an in-memory Cursor.
    murmur3::murmur3_x64_128(&mut std::io::Cursor::new(bytes), 0)
        .expect("hashing an in-memory buffer cannot fail")
}

/// Lazily yields `(offset, hash)` for each full block of `source`, in
/// ascending offset order. Consumers that need random access (the image
/// index) materialize the whole stream; per-file discovery can consume it
/// incrementally, though in practice per-file sizes are small enough that a
/// `Vec` is fine too (see [`hash_all_blocks`]).
pub struct BlockHasher<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    block_size: u64,
    next_offset: u64,
    buf: Vec<u8>,
}

impl<'a, S: ByteSource + ?Sized> BlockHasher<'a, S> {
    pub fn new(source: &'a S, block_size: u64) -> Self {
        BlockHasher {
            source,
            block_size,
            next_offset: 0,
            buf: vec![0u8; block_size as usize],
        }
    }
}

impl<'a, S: ByteSource + ?Sized> Iterator for BlockHasher<'a, S> {
    type Item = Result<(u64, BlockHash)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_offset + self.block_size > self.source.len() {
            return None;
        }
        let offset = self.next_offset;
        if let Err(e) = self.source.read_at(offset, &mut self.buf) {
            return Some(Err(e));
        }
        self.next_offset += self.block_size;
        Some(Ok((offset, hash_block(&self.buf))))
    }
}

/// Computes the hash of every full block of `source`, in order. Used for
/// per-file block-hash caches, where materializing the whole (small)
/// sequence up front is simpler than threading a lazy iterator through the
/// extender's lookahead.
pub fn hash_all_blocks<S: ByteSource + ?Sized>(
    source: &S,
    block_size: u64,
) -> Result<Vec<BlockHash>> {
    BlockHasher::new(source, block_size)
        .map(|r| r.map(|(_, h)| h))
        .collect()
}
