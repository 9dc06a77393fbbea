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

//! Extent Discoverer (spec.md §4.6): orchestrates the Candidate Matcher,
//! Byte Verifier and Extent Extender for one extracted file, applying the
//! step-size advance policy, and yields its non-overlapping extent list.

use crate::config::Config;
use crate::error::Result;
use crate::extend::extend;
use crate::hash::hash_all_blocks;
use crate::index::ImageBlockIndex;
use crate::progress::{Event, ProgressSink};
use crate::source::ByteSource;
use crate::verify::verify_extent;

/// A verified, non-overlapping (within this file) match between an
/// extracted file and the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedExtent {
    pub file_path: String,
    pub file_offset: u64,
    pub image_offset: u64,
    pub length: u64,
}

/// Candidate Matcher (spec.md §4.3): the image offsets a file block's hash
/// could start an extent at, in ascending order. No filtering happens
/// here -- a miss is just an empty slice.
fn candidates<'a>(index: &'a ImageBlockIndex, file_block_hash: crate::hash::BlockHash) -> &'a [u64] {
    index.lookup(file_block_hash)
}

/// Runs the Extent Discoverer over one extracted file, per spec.md §4.6.
pub fn discover_extents(
    file: &dyn ByteSource,
    file_path: &str,
    image: &dyn ByteSource,
    index: &ImageBlockIndex,
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<Vec<VerifiedExtent>> {
    progress.emit(Event::HashingFile { path: file_path });
    let file_block_hashes = hash_all_blocks(file, config.block_size)?;

    let file_len = file.len();
    let image_len = image.len();
    let mut results = Vec::new();
    let mut file_pos: u64 = 0;

    while file_pos + config.min_extent_size <= file_len {
        progress.emit(Event::MatchingFile {
            path: file_path,
            progress_pct: ((file_pos * 100) / file_len.max(1)) as u8,
        });

        let block_index = (file_pos / config.block_size) as usize;
        let mut matched: Option<u64> = None;

        if let Some(&hash) = file_block_hashes.get(block_index) {
            for &image_offset in candidates(index, hash) {
                // A candidate within `M` of the image's end can never carry
                // an `M`-length verified extent; skip it rather than let
                // the verifier read past `image_len` (spec.md §8: "File
                // longer than image: ... no out-of-range reads").
                if image_offset + config.min_extent_size > image_len {
                    continue;
                }
                if verify_extent(
                    file,
                    image,
                    file_pos,
                    image_offset,
                    config.min_extent_size,
                    config.write_chunk_size,
                )? {
                    matched = Some(image_offset);
                    break;
                }
            }
        }

        match matched {
            Some(image_offset) => {
                let length = extend(
                    file,
                    image,
                    file_pos,
                    image_offset,
                    config.min_extent_size,
                    config.block_size,
                    &file_block_hashes,
                    config.write_chunk_size,
                )?;
                progress.emit(Event::ExtentFound {
                    path: file_path,
                    file_offset: file_pos,
                    image_offset,
                    length,
                });
                results.push(VerifiedExtent {
                    file_path: file_path.to_string(),
                    file_offset: file_pos,
                    image_offset,
                    length,
                });
                file_pos += length;
            }
            None => {
                file_pos += config.step_size;
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullSink;
    use crate::source::test_support::InMemorySource;

    fn cfg(block_size: u64, min_extent_size: u64, step_size: u64) -> Config {
        Config::new(block_size, min_extent_size, step_size, 1024).unwrap()
    }

    #[test]
    fn exact_overlay_single_extent() {
        // B=16, M=64. N=256, F = I[64..192).
        let mut image_data = vec![0u8; 256];
        for (i, b) in image_data.iter_mut().enumerate() {
            *b = (i * 7 % 251) as u8;
        }
        let file_data = image_data[64..192].to_vec();
        let image = InMemorySource::new("img", image_data);
        let file = InMemorySource::new("f", file_data);
        let config = cfg(16, 64, 64);
        let index = ImageBlockIndex::build(&image, config.block_size, &NullSink).unwrap();

        let extents = discover_extents(&file, "f", &image, &index, &config, &NullSink).unwrap();
        assert_eq!(extents.len(), 1);
        assert_eq!(extents[0].file_offset, 0);
        assert_eq!(extents[0].image_offset, 64);
        assert_eq!(extents[0].length, 128);
    }

    #[test]
    fn no_match_yields_no_extents() {
        let image_data = (0u32..128).map(|i| (i * 31 % 251) as u8).collect::<Vec<_>>();
        let file_data = vec![0u8; 128];
        let image = InMemorySource::new("img", image_data);
        let file = InMemorySource::new("f", file_data);
        let config = cfg(16, 64, 64);
        let index = ImageBlockIndex::build(&image, config.block_size, &NullSink).unwrap();

        let extents = discover_extents(&file, "f", &image, &index, &config, &NullSink).unwrap();
        assert!(extents.is_empty());
    }

    #[test]
    fn misaligned_file_finds_nothing() {
        // F[0..M+10) == I[5..5+M+10); block hashes never align.
        let mut image_data = vec![0u8; 256];
        for (i, b) in image_data.iter_mut().enumerate() {
            *b = (i * 13 % 251) as u8;
        }
        let file_data = image_data[5..5 + 74].to_vec();
        let image = InMemorySource::new("img", image_data);
        let file = InMemorySource::new("f", file_data);
        let config = cfg(16, 64, 64);
        let index = ImageBlockIndex::build(&image, config.block_size, &NullSink).unwrap();

        let extents = discover_extents(&file, "f", &image, &index, &config, &NullSink).unwrap();
        assert!(extents.is_empty());
    }

    #[test]
    fn multiple_extents_with_gap() {
        // F = I[0..M) ++ X ++ I[3M..4M), M=64.
        let m = 64u64;
        let mut image_data = vec![0u8; (4 * m) as usize];
        for (i, b) in image_data.iter_mut().enumerate() {
            *b = (i * 17 % 251) as u8;
        }
        let mut file_data = image_data[0..m as usize].to_vec();
        file_data.extend((0..m).map(|i| (200 + i) as u8)); // X, not in image
        file_data.extend(image_data[(3 * m) as usize..(4 * m) as usize].to_vec());

        let image = InMemorySource::new("img", image_data);
        let file = InMemorySource::new("f", file_data);
        let config = cfg(16, m, m);
        let index = ImageBlockIndex::build(&image, config.block_size, &NullSink).unwrap();

        let extents = discover_extents(&file, "f", &image, &index, &config, &NullSink).unwrap();
        assert_eq!(extents.len(), 2);
        assert_eq!(extents[0].image_offset, 0);
        assert_eq!(extents[1].image_offset, 3 * m);
    }

    #[test]
    fn candidate_within_m_of_image_end_is_skipped_not_fatal() {
        // N=256, B=16, M=64: file's first block equals I[240..256), the
        // image's last block. That candidate can never carry an M-length
        // extent -- it must be skipped rather than sent to the verifier,
        // which would otherwise read past the image's end.
        let mut image_data = vec![0u8; 256];
        for (i, b) in image_data.iter_mut().enumerate() {
            *b = (i * 29 % 251) as u8;
        }
        let mut file_data = image_data[240..256].to_vec(); // matches image's last block
        file_data.extend(vec![0xAAu8; 64]); // padding so the file has an M-length window to try
        let image = InMemorySource::new("img", image_data);
        let file = InMemorySource::new("f", file_data);
        let config = cfg(16, 64, 64);
        let index = ImageBlockIndex::build(&image, config.block_size, &NullSink).unwrap();

        let extents = discover_extents(&file, "f", &image, &index, &config, &NullSink).unwrap();
        assert!(extents.is_empty());
    }

    #[test]
    fn file_longer_than_image_no_out_of_range_read() {
        // File shares a full-length match with the whole image, then
        // carries extra trailing bytes past the image's length -- the
        // extender must stop exactly at image_len rather than reading past it.
        let m = 64u64;
        let mut image_data = vec![0u8; m as usize];
        for (i, b) in image_data.iter_mut().enumerate() {
            *b = (i * 11 % 251) as u8;
        }
        let mut file_data = image_data.clone();
        file_data.extend(vec![0xFFu8; 32]); // file is longer than the image

        let image = InMemorySource::new("img", image_data);
        let file = InMemorySource::new("f", file_data);
        let config = cfg(16, m, m);
        let index = ImageBlockIndex::build(&image, config.block_size, &NullSink).unwrap();

        let extents = discover_extents(&file, "f", &image, &index, &config, &NullSink).unwrap();
        assert_eq!(extents.len(), 1);
        assert_eq!(extents[0].file_offset, 0);
        assert_eq!(extents[0].image_offset, 0);
        assert_eq!(extents[0].length, m);
    }
}
