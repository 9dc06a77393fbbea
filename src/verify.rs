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

//! Byte Verifier (spec.md §4.4): confirms candidate matches bit-for-bit,
//! eliminating hash collisions. A verification failure is not an error --
//! it just disqualifies the candidate -- so this returns `Result<bool>`
//! rather than `Result<()>`.

use crate::error::Result;
use crate::source::ByteSource;

/// Compares `file[file_offset..file_offset+len)` against
/// `image[image_offset..image_offset+len)` for exact equality, reading in
/// chunks of at most `chunk_size` bytes. Both regions are assumed to
/// already be known in-bounds by the caller.
pub fn bytes_equal(
    file: &dyn ByteSource,
    image: &dyn ByteSource,
    file_offset: u64,
    image_offset: u64,
    len: u64,
    chunk_size: u64,
) -> Result<bool> {
    let mut file_buf = vec![0u8; chunk_size as usize];
    let mut image_buf = vec![0u8; chunk_size as usize];

    let mut done = 0u64;
    while done < len {
        let n = chunk_size.min(len - done) as usize;
        file.read_at(file_offset + done, &mut file_buf[..n])?;
        image.read_at(image_offset + done, &mut image_buf[..n])?;
        if file_buf[..n] != image_buf[..n] {
            return Ok(false);
        }
        done += n as u64;
    }
    Ok(true)
}

/// Verifies the minimum-extent-sized window (`M` bytes) at a candidate
/// `(file_offset, image_offset)` pair. A `false` result disqualifies the
/// candidate; `true` means the Extent Extender can be invoked.
pub fn verify_extent(
    file: &dyn ByteSource,
    image: &dyn ByteSource,
    file_offset: u64,
    image_offset: u64,
    min_extent_size: u64,
    chunk_size: u64,
) -> Result<bool> {
    bytes_equal(
        file,
        image,
        file_offset,
        image_offset,
        min_extent_size,
        chunk_size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::InMemorySource;

    #[test]
    fn identical_regions_verify() {
        let file = InMemorySource::new("f", vec![5u8; 64]);
        let image = InMemorySource::new("i", vec![5u8; 64]);
        assert!(verify_extent(&file, &image, 0, 0, 64, 16).unwrap());
    }

    #[test]
    fn differing_regions_fail() {
        let mut data = vec![5u8; 64];
        data[40] = 9;
        let file = InMemorySource::new("f", data);
        let image = InMemorySource::new("i", vec![5u8; 64]);
        assert!(!verify_extent(&file, &image, 0, 0, 64, 16).unwrap());
    }

    #[test]
    fn comparison_respects_chunk_size_boundary() {
        // chunk_size doesn't evenly divide len; mismatch falls in the last,
        // smaller chunk.
        let mut data = vec![1u8; 50];
        data[49] = 2;
        let file = InMemorySource::new("f", data);
        let image = InMemorySource::new("i", vec![1u8; 50]);
        assert!(!bytes_equal(&file, &image, 0, 0, 50, 16).unwrap());
    }
}
