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

//! Extent Extender (spec.md §4.5): grows a verified starting alignment
//! forward to the longest contiguous equality, first block-by-block (using
//! the file's cached block hashes to cheaply rule out non-matches), then
//! byte-by-byte over the tail.

use crate::error::Result;
use crate::hash::{hash_block, BlockHash};
use crate::source::ByteSource;
use crate::verify::bytes_equal;

/// Extends `length` forward from `(file_offset, image_offset)`, starting at
/// `length = min_extent_size` (already verified equal by the Byte
/// Verifier). `file_block_hashes` is the full per-file block-hash cache
/// computed once by the Extent Discoverer; it lets the block-wise phase
/// skip a byte comparison whenever the next block's hashes already differ.
pub fn extend(
    file: &dyn ByteSource,
    image: &dyn ByteSource,
    file_offset: u64,
    image_offset: u64,
    start_length: u64,
    block_size: u64,
    file_block_hashes: &[BlockHash],
    chunk_size: u64,
) -> Result<u64> {
    let file_len = file.len();
    let image_len = image.len();
    let mut length = start_length;

    // Block-wise phase. Only meaningful once `length` lands back on a block
    // boundary (it starts at `min_extent_size`, which need not be a
    // multiple of `block_size`); otherwise skip straight to the byte-wise
    // tail phase below.
    while (file_offset + length) % block_size == 0 {
        if file_offset + length + block_size > file_len {
            break;
        }
        if image_offset + length + block_size > image_len {
            break;
        }

        let next_file_block_index = ((file_offset + length) / block_size) as usize;
        let next_file_hash = match file_block_hashes.get(next_file_block_index) {
            Some(h) => *h,
            None => break,
        };

        let mut image_block = vec![0u8; block_size as usize];
        image.read_at(image_offset + length, &mut image_block)?;
        let next_image_hash = hash_block(&image_block);

        if next_file_hash != next_image_hash {
            break;
        }

        // Hashes agree; confirm with a full byte comparison before trusting it.
        if !bytes_equal(
            file,
            image,
            file_offset + length,
            image_offset + length,
            block_size,
            chunk_size,
        )? {
            break;
        }

        length += block_size;
    }

    // Byte-wise tail phase.
    let file_remaining = file_len - (file_offset + length);
    let image_remaining = image_len - (image_offset + length);
    let max_tail = file_remaining.min(image_remaining);

    let mut buf_file = vec![0u8; chunk_size.min(max_tail.max(1)) as usize];
    let mut buf_image = vec![0u8; buf_file.len()];
    let mut tail_checked = 0u64;
    'tail: while tail_checked < max_tail {
        let n = (chunk_size.min(max_tail - tail_checked)) as usize;
        file.read_at(file_offset + length + tail_checked, &mut buf_file[..n])?;
        image.read_at(image_offset + length + tail_checked, &mut buf_image[..n])?;
        for i in 0..n {
            if buf_file[i] != buf_image[i] {
                length += tail_checked + i as u64;
                break 'tail;
            }
        }
        tail_checked += n as u64;
    }
    if tail_checked == max_tail {
        length += tail_checked;
    }

    Ok(length)
}
