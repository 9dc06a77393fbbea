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

//! Core extent-discovery and reconstruction-plan-building engine, plus the
//! thin adapters (CLI, file list, metadata walk, script emission) around
//! it. See `SPEC_FULL.md` at the repository root for the full module map.

pub mod config;
pub mod discover;
pub mod error;
pub mod extend;
pub mod hash;
pub mod index;
pub mod plan;
pub mod progress;
pub mod source;
pub mod verify;

pub mod cli;
pub mod filelist;
pub mod metadata;
pub mod script;

use ::anyhow::{Context, Result};

use crate::config::Config;
use crate::discover::{discover_extents, VerifiedExtent};
use crate::index::ImageBlockIndex;
use crate::plan::{build_plan, Segment};
use crate::progress::ProgressSink;
use crate::source::{ByteSource, ExtractedFile, Image};

/// Runs the full pipeline described in spec.md §2: build the image index,
/// discover extents in every extracted file, then build the plan. This is
/// the single entry point `main.rs` drives; it's kept here (rather than
/// only in `main.rs`) so integration tests can exercise the whole thing
/// without going through the CLI or real files.
pub fn generate_plan(
    image: &dyn ByteSource,
    files: &[(String, Box<dyn ByteSource>)],
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<Vec<Segment>> {
    let index = ImageBlockIndex::build(image, config.block_size, progress)
        .context("building image block index")?;

    let mut all_extents: Vec<VerifiedExtent> = Vec::new();
    for (path, file) in files {
        let extents = discover_extents(file.as_ref(), path, image, &index, config, progress)
            .with_context(|| format!("discovering extents in {path}"))?;
        all_extents.extend(extents);
    }

    Ok(build_plan(image.len(), all_extents, progress))
}

/// Convenience entry point that opens the image and extracted files from
/// disk paths, as the CLI does.
pub fn generate_plan_from_paths(
    image_path: &str,
    file_paths: &[(String, u64)],
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<Vec<Segment>> {
    let image = Image::open(image_path).context("opening image")?;
    let mut files: Vec<(String, Box<dyn ByteSource>)> = Vec::with_capacity(file_paths.len());
    for (path, len) in file_paths {
        let file = ExtractedFile::open(path, *len)
            .with_context(|| format!("opening extracted file {path}"))?;
        files.push((path.clone(), Box::new(file)));
    }
    generate_plan(&image, &files, config, progress)
}
