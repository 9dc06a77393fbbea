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

//! Reads the extracted-file path list (spec.md §6), newline- or
//! NUL-delimited, from a file or from standard input.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Reads and splits the path list. `input` is the argument to `-i/--input`
/// (`None` means read from stdin); `null_delimited` mirrors `-0/--null`.
pub fn read_file_list(input: Option<&str>, null_delimited: bool) -> Result<Vec<PathBuf>> {
    let contents = match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading file list {:?}", path))?
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading file list from standard input")?;
            buf
        }
    };

    let sep = if null_delimited { '\0' } else { '\n' };
    Ok(contents
        .split(sep)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect())
}
