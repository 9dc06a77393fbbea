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

//! Image Block Index (spec.md §4.2): maps a block hash to the image offsets
//! where it was observed, in ascending order.

use std::collections::HashMap;

use crate::error::Result;
use crate::hash::{BlockHash, BlockHasher};
use crate::progress::{Event, ProgressSink};
use crate::source::ByteSource;

/// Immutable once built. Empty lookups return an empty slice rather than an
/// `Option`, since a miss is an expected, non-error outcome.
pub struct ImageBlockIndex {
    by_hash: HashMap<BlockHash, Vec<u64>>,
}

impl ImageBlockIndex {
    /// Builds the index from a single sequential pass over `image`.
    pub fn build(image: &dyn ByteSource, block_size: u64, progress: &dyn ProgressSink) -> Result<Self> {
        progress.emit(Event::HashingImage);
        let mut by_hash: HashMap<BlockHash, Vec<u64>> = HashMap::new();
        for result in BlockHasher::new(image, block_size) {
            let (offset, hash) = result?;
            // Vec::push preserves ascending order since the hasher emits in order.
            by_hash.entry(hash).or_default().push(offset);
        }
        Ok(ImageBlockIndex { by_hash })
    }

    /// Image offsets with the given block hash, in ascending order. Empty
    /// on a miss.
    pub fn lookup(&self, hash: BlockHash) -> &[u64] {
        self.by_hash.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry_count(&self) -> usize {
        self.by_hash.values().map(Vec::len).sum()
    }
}
