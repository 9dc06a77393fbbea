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

use crate::error::{Error, Result};

/// Default block size for the hasher: 4 KiB.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;
/// Default minimum extent size: 1 MiB.
pub const DEFAULT_MIN_EXTENT_SIZE: u64 = 1024 * 1024;
/// Default I/O chunk size used when verifying and copying: 16 MiB.
pub const DEFAULT_WRITE_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Immutable configuration threaded through the core. Constructed once via
/// [`Config::new`], which rejects the `Configuration-invalid` cases.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// `B`: block size for hashing. Only offsets that are multiples of this
    /// participate in the hash index.
    pub block_size: u64,
    /// `M`: minimum length an extent must reach before it's accepted.
    pub min_extent_size: u64,
    /// `S`: advance distance when a file block has no candidate match.
    pub step_size: u64,
    /// Read-buffer size used by the byte verifier and extent extender.
    pub write_chunk_size: u64,
}

impl Config {
    pub fn new(
        block_size: u64,
        min_extent_size: u64,
        step_size: u64,
        write_chunk_size: u64,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::ConfigInvalid("block size must be positive".into()));
        }
        if min_extent_size == 0 {
            return Err(Error::ConfigInvalid(
                "minimum extent size must be positive".into(),
            ));
        }
        if step_size < 1 {
            return Err(Error::ConfigInvalid("step size must be at least 1".into()));
        }
        if min_extent_size < block_size {
            return Err(Error::ConfigInvalid(format!(
                "minimum extent size ({min_extent_size}) must be at least the block size ({block_size})"
            )));
        }
        if write_chunk_size == 0 {
            return Err(Error::ConfigInvalid(
                "write chunk size must be positive".into(),
            ));
        }

        Ok(Config {
            block_size,
            min_extent_size,
            step_size,
            write_chunk_size,
        })
    }

    /// Config with `S` defaulted to `M`, as documented in spec.md.
    pub fn with_defaults(block_size: u64, min_extent_size: u64) -> Result<Self> {
        Self::new(
            block_size,
            min_extent_size,
            min_extent_size,
            DEFAULT_WRITE_CHUNK_SIZE,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(
            DEFAULT_BLOCK_SIZE,
            DEFAULT_MIN_EXTENT_SIZE,
            DEFAULT_MIN_EXTENT_SIZE,
            DEFAULT_WRITE_CHUNK_SIZE,
        )
        .expect("default configuration is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_block_size() {
        assert!(Config::new(0, 1024, 1024, 4096).is_err());
    }

    #[test]
    fn rejects_min_extent_below_block_size() {
        assert!(Config::new(4096, 100, 100, 4096).is_err());
    }

    #[test]
    fn rejects_zero_step_size() {
        assert!(Config::new(16, 64, 0, 4096).is_err());
    }

    #[test]
    fn default_is_valid() {
        let _ = Config::default();
    }
}
