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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the core extent-discovery and plan-building engine.
///
/// All variants are fatal to the run; the core never skips a file or emits
/// a partial plan in response to one of these.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{path}: cannot be opened")]
    InputMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: short read at offset {offset}: expected {expected} bytes, got {got}")]
    ShortRead {
        path: PathBuf,
        offset: u64,
        expected: usize,
        got: usize,
    },

    #[error("{path}: size changed since it was listed: expected {expected} bytes, found {found}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("{path}: I/O error at offset {offset}")]
    Io {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
