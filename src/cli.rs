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

//! Command-line surface (spec.md §6, "surrounding boundary, for context
//! only"). Args are listed in `--help` in declaration order, matching the
//! teacher's convention in `src/cmdline/mod.rs`.

use clap::Parser;

use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_MIN_EXTENT_SIZE, DEFAULT_WRITE_CHUNK_SIZE};

#[derive(Debug, Parser)]
#[clap(name = "imgrecon-gen", version)]
#[clap(about = "Generate a self-contained shell script that reconstructs an image")]
pub struct Args {
    /// Path to the original image to reconstruct
    pub image: String,

    /// File containing the list of already-extracted file paths (default: standard input)
    #[clap(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<String>,

    /// Treat the input list as NUL-delimited instead of newline-delimited
    #[clap(short = '0', long = "null")]
    pub null: bool,

    /// Path to write the generated reconstruction script to
    #[clap(short = 'o', long = "output", value_name = "FILE")]
    pub output: String,

    /// Block size used for content hashing
    #[clap(short = 'b', long = "block-size", value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: u64,

    /// Minimum size an extent must reach to be embedded as a Copy
    #[clap(short = 'm', long = "min-extent-size", value_name = "BYTES", default_value_t = DEFAULT_MIN_EXTENT_SIZE)]
    pub min_extent_size: u64,

    /// Advance distance used when a file block has no candidate match (default: same as -m)
    #[clap(short = 's', long = "step-size", value_name = "BYTES")]
    pub step_size: Option<u64>,

    /// I/O buffer size used for verification and copying
    #[clap(long = "write-chunk-size", value_name = "BYTES", default_value_t = DEFAULT_WRITE_CHUNK_SIZE)]
    pub write_chunk_size: u64,

    /// Print progress to standard error
    #[clap(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Don't record file ownership in the generated script
    #[clap(long = "no-ownership")]
    pub no_ownership: bool,

    /// Don't record ACLs in the generated script
    #[clap(long = "no-acl")]
    pub no_acl: bool,

    /// Don't record MD5 checksums in the generated script
    #[clap(long = "no-md5")]
    pub no_md5: bool,

    /// Don't record SHA-256 checksums in the generated script
    #[clap(long = "no-sha256")]
    pub no_sha256: bool,
}

impl Args {
    pub fn step_size(&self) -> u64 {
        self.step_size.unwrap_or(self.min_extent_size)
    }
}
